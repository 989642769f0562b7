//! External command dispatch: argument layout, host path mapping, real child processes.

use eegwatch::engine::{HostDirs, NamespaceMapping, TrackingStore};
use eegwatch::pipeline::{CommandDispatcher, Dispatch, WorkerPool, command_args, work_queue};
use eegwatch::{Job, JobSpec, LocalPrefixes, Outcome};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn spec(command: PathBuf, work_dir: Option<PathBuf>) -> Arc<JobSpec> {
    Arc::new(JobSpec {
        command,
        task: "ASSR".to_string(),
        config_path: PathBuf::from("/config/autoclean_config.yaml"),
        output_dir: PathBuf::from("/data/output"),
        work_dir,
    })
}

fn host_dirs() -> HostDirs {
    HostDirs {
        input: "/mnt/lab/raw".to_string(),
        output: "/mnt/lab/out/".to_string(),
        config: "/mnt/lab/config".to_string(),
        autoclean: String::new(),
    }
}

fn as_strings(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

#[test]
fn test_command_args_order() {
    let job = Job::new(
        PathBuf::from("/data/input/s01.edf"),
        0,
        spec(PathBuf::from("/opt/run.sh"), None),
    );
    assert_eq!(
        as_strings(&command_args(&job)),
        [
            "-DataPath",
            "/data/input/s01.edf",
            "-Task",
            "ASSR",
            "-ConfigPath",
            "/config/autoclean_config.yaml",
            "-OutputPath",
            "/data/output",
        ]
    );

    let job = Job::new(
        PathBuf::from("/data/input/s01.edf"),
        2,
        spec(PathBuf::from("/opt/run.sh"), Some(PathBuf::from("/autoclean/work"))),
    );
    let args = as_strings(&command_args(&job));
    assert_eq!(args.len(), 10);
    assert_eq!(&args[8..], ["-WorkDir", "/autoclean/work"]);
}

// --- namespace mapping ---

#[test]
fn test_translate_rewrites_mapped_prefixes() {
    let mapping = NamespaceMapping::new(host_dirs(), &LocalPrefixes::default());
    assert!(mapping.is_configured());
    assert_eq!(
        mapping.translate(Path::new("/data/input/sub/s01.edf")),
        "/mnt/lab/raw/sub/s01.edf"
    );
    assert_eq!(
        mapping.translate(Path::new("/data/output")),
        "/mnt/lab/out"
    );
    assert_eq!(
        mapping.translate(Path::new("/config/autoclean_config.yaml")),
        "/mnt/lab/config/autoclean_config.yaml"
    );
    // Unset host dir and unrelated paths pass through.
    assert_eq!(
        mapping.translate(Path::new("/autoclean/work")),
        "/autoclean/work"
    );
    assert_eq!(mapping.translate(Path::new("/tmp/x.edf")), "/tmp/x.edf");
    // Prefix matching is per component.
    assert_eq!(
        mapping.translate(Path::new("/data/inputs/x.edf")),
        "/data/inputs/x.edf"
    );
}

#[test]
fn test_translate_uses_configured_local_prefixes() {
    let prefixes = LocalPrefixes {
        input: PathBuf::from("/srv/eeg"),
        ..LocalPrefixes::default()
    };
    let mapping = NamespaceMapping::new(host_dirs(), &prefixes);
    assert_eq!(
        mapping.translate(Path::new("/srv/eeg/a.set")),
        "/mnt/lab/raw/a.set"
    );
    assert_eq!(
        mapping.translate(Path::new("/data/input/a.set")),
        "/data/input/a.set"
    );
}

#[test]
fn test_command_env_only_when_configured() {
    let job = Job::new(
        PathBuf::from("/data/input/s01.edf"),
        0,
        spec(PathBuf::from("/opt/run.sh"), Some(PathBuf::from("/autoclean/work"))),
    );
    assert!(NamespaceMapping::disabled().command_env(&job).is_empty());

    let mapping = NamespaceMapping::new(host_dirs(), &LocalPrefixes::default());
    let env = mapping.command_env(&job);
    let get = |key: &str| {
        env.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(get("HOST_INPUT_DIR"), Some("/mnt/lab/raw"));
    assert_eq!(get("HOST_FILE_PATH"), Some("/mnt/lab/raw/s01.edf"));
    assert_eq!(get("HOST_OUTPUT_PATH"), Some("/mnt/lab/out"));
    assert_eq!(
        get("HOST_CONFIG_PATH"),
        Some("/mnt/lab/config/autoclean_config.yaml")
    );
    assert_eq!(get("HOST_WORK_DIR"), Some("/autoclean/work"));
    assert_eq!(get("HOST_AUTOCLEAN_DIR"), Some(""));
}

// --- child processes ---

#[cfg(unix)]
mod unix {
    use super::*;
    use eegwatch::pipeline::ensure_invocable;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_ensure_invocable_adds_execute_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sh");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        ensure_invocable(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[test]
    fn test_missing_command_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_invocable(&dir.path().join("nope.sh")).is_err());
        assert!(ensure_invocable(dir.path()).is_err());
        assert!(
            CommandDispatcher::new(&dir.path().join("nope.sh"), NamespaceMapping::disabled())
                .is_err()
        );
    }

    #[test]
    fn test_exit_zero_is_success_and_receives_args() {
        let dir = tempfile::tempdir().unwrap();
        let seen = dir.path().join("seen.txt");
        let script = write_script(
            dir.path(),
            "ok.sh",
            &format!("echo \"$@\" > '{}'\nexit 0", seen.display()),
        );
        let dispatcher = CommandDispatcher::new(&script, NamespaceMapping::disabled()).unwrap();
        let job = Job::new(dir.path().join("s01.edf"), 0, spec(script, None));

        assert_eq!(dispatcher.dispatch(&job), Outcome::Success);
        let seen = std::fs::read_to_string(seen).unwrap();
        assert!(seen.starts_with("-DataPath "));
        assert!(seen.contains("-Task ASSR"));
    }

    #[test]
    fn test_nonzero_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "bad.sh", "echo 'bad header' >&2\nexit 2");
        let dispatcher = CommandDispatcher::new(&script, NamespaceMapping::disabled()).unwrap();
        let job = Job::new(dir.path().join("s01.edf"), 0, spec(script, None));

        assert_eq!(
            dispatcher.dispatch(&job),
            Outcome::Failure("bad header".to_string())
        );
    }

    #[test]
    fn test_nonzero_exit_without_stderr_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "quiet.sh", "exit 3");
        let dispatcher = CommandDispatcher::new(&script, NamespaceMapping::disabled()).unwrap();
        let job = Job::new(dir.path().join("s01.edf"), 0, spec(script, None));

        match dispatcher.dispatch(&job) {
            Outcome::Failure(text) => assert!(text.contains('3'), "{text}"),
            Outcome::Success => panic!("expected failure"),
        }
    }

    #[test]
    fn test_host_env_reaches_child() {
        let dir = tempfile::tempdir().unwrap();
        let seen = dir.path().join("env.txt");
        let script = write_script(
            dir.path(),
            "env.sh",
            &format!("echo \"$HOST_FILE_PATH\" > '{}'", seen.display()),
        );
        let mapping = NamespaceMapping::new(host_dirs(), &LocalPrefixes::default());
        let dispatcher = CommandDispatcher::new(&script, mapping).unwrap();
        let job = Job::new(PathBuf::from("/data/input/s07.edf"), 0, spec(script, None));

        assert_eq!(dispatcher.dispatch(&job), Outcome::Success);
        assert_eq!(
            std::fs::read_to_string(seen).unwrap().trim(),
            "/mnt/lab/raw/s07.edf"
        );
    }

    fn pool_with(
        dispatcher: CommandDispatcher,
        store: &Arc<TrackingStore>,
    ) -> (eegwatch::pipeline::JobSender, WorkerPool) {
        let (tx, rx) = work_queue();
        let pool = WorkerPool::spawn(
            1,
            rx,
            Arc::new(dispatcher),
            Arc::clone(store),
            Duration::from_millis(20),
        )
        .unwrap();
        (tx, pool)
    }

    #[test]
    fn test_failed_command_does_not_stop_the_pool() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "picky.sh",
            "case \"$2\" in *c.edf) echo 'bad header' >&2; exit 2;; esac\nexit 0",
        );
        let dispatcher = CommandDispatcher::new(&script, NamespaceMapping::disabled()).unwrap();
        let store = Arc::new(TrackingStore::open_in_memory().unwrap());
        let (tx, pool) = pool_with(dispatcher, &store);

        let spec = spec(script, None);
        tx.submit(Job::new(dir.path().join("c.edf"), 0, Arc::clone(&spec)));
        tx.submit(Job::new(dir.path().join("d.edf"), 0, spec));
        drop(tx);
        let stats = pool.join();

        assert_eq!((stats.succeeded, stats.failed), (1, 1));
        let failure = store.failure_record("c.edf").unwrap();
        assert_eq!(failure.retry_count, 1);
        assert_eq!(failure.error, "bad header");
        assert!(store.is_succeeded("d.edf"));
    }

    #[test]
    fn test_command_gone_after_startup_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "vanishing.sh", "exit 0");
        let dispatcher = CommandDispatcher::new(&script, NamespaceMapping::disabled()).unwrap();
        std::fs::remove_file(&script).unwrap();

        let job = Job::new(dir.path().join("a.edf"), 0, spec(script.clone(), None));
        match dispatcher.dispatch(&job) {
            Outcome::Failure(text) => assert!(text.contains("vanishing.sh"), "{text}"),
            Outcome::Success => panic!("expected failure"),
        }

        // The worker records the failure and keeps taking jobs.
        let store = Arc::new(TrackingStore::open_in_memory().unwrap());
        let (tx, pool) = pool_with(dispatcher, &store);
        let spec = spec(script, None);
        tx.submit(Job::new(dir.path().join("a.edf"), 0, Arc::clone(&spec)));
        tx.submit(Job::new(dir.path().join("b.edf"), 0, spec));
        drop(tx);
        let stats = pool.join();

        assert_eq!((stats.succeeded, stats.failed), (0, 2));
        assert_eq!(store.retry_count_of("a.edf"), 1);
        assert_eq!(store.retry_count_of("b.edf"), 1);
    }

    #[test]
    fn test_dispatcher_runs_the_command_it_checked() {
        let dir = tempfile::tempdir().unwrap();
        let checked = write_script(dir.path(), "checked.sh", "exit 0");
        let other = write_script(dir.path(), "other.sh", "exit 9");
        let dispatcher = CommandDispatcher::new(&checked, NamespaceMapping::disabled()).unwrap();
        assert_eq!(dispatcher.command(), checked.as_path());

        let job = Job::new(dir.path().join("a.edf"), 0, spec(other, None));
        assert_eq!(dispatcher.dispatch(&job), Outcome::Success);
    }

    #[test]
    fn test_run_once_leaves_ctrl_c_alone() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "run.sh", "exit 0");
        let config = dir.path().join("autoclean_config.yaml");
        std::fs::write(&config, "tasks: {}\n").unwrap();
        std::fs::write(dir.path().join("a.edf"), b"x").unwrap();
        let opts = eegwatch::Opts {
            dir: dir.path().to_path_buf(),
            extensions: vec!["edf".to_string()],
            script: Some(script),
            task: Some("ASSR".to_string()),
            config: Some(config),
            output: Some(dir.path().join("out")),
            once: true,
            ..eegwatch::Opts::default()
        };

        // A Ctrl+C handler can be installed once per process, so a second run
        // only succeeds if once mode never installs one.
        let first = eegwatch::run_watchdog(&opts).unwrap();
        assert_eq!(first.stats.succeeded, 1);
        let second = eegwatch::run_watchdog(&opts).unwrap();
        assert_eq!(second.scanned, 0);
    }
}
