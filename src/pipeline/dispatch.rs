//! Dispatcher: run the external processing command for one job and report the outcome.

use anyhow::{Context, Result, bail};
use log::{debug, error, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::engine::namespace::NamespaceMapping;
use crate::engine::tools::truncate_chars;
use crate::utils::config::ERROR_TEXT_LIMIT;
use crate::{Job, Outcome};

/// Anything that can process one job. The pool only depends on this.
pub trait Dispatch: Send + Sync {
    fn dispatch(&self, job: &Job) -> Outcome;
}

/// Make sure `command` exists and can be executed, adding execute bits on Unix when missing.
pub fn ensure_invocable(command: &Path) -> Result<()> {
    let meta = std::fs::metadata(command)
        .with_context(|| format!("processing command not found: {}", command.display()))?;
    if !meta.is_file() {
        bail!("processing command is not a file: {}", command.display());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = meta.permissions();
        if perms.mode() & 0o111 == 0 {
            perms.set_mode(perms.mode() | 0o111);
            std::fs::set_permissions(command, perms).with_context(|| {
                format!("make processing command executable: {}", command.display())
            })?;
            info!("Made processing command executable: {}", command.display());
        }
    }
    Ok(())
}

/// Positional flags for the external command, in the order the pipeline expects.
pub fn command_args(job: &Job) -> Vec<OsString> {
    let spec = &job.spec;
    let mut args: Vec<OsString> = vec![
        "-DataPath".into(),
        job.file_path.clone().into(),
        "-Task".into(),
        spec.task.clone().into(),
        "-ConfigPath".into(),
        spec.config_path.clone().into(),
        "-OutputPath".into(),
        spec.output_dir.clone().into(),
    ];
    if let Some(ref work_dir) = spec.work_dir {
        args.push("-WorkDir".into());
        args.push(work_dir.clone().into());
    }
    args
}

/// Failure text: trimmed stderr, or a description of the exit status when stderr is empty.
fn failure_text(stderr: &str, status: ExitStatus) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("processing command {status}")
    } else {
        truncate_chars(stderr, ERROR_TEXT_LIMIT)
    }
}

/// Runs the configured external command as a child process.
pub struct CommandDispatcher {
    command: PathBuf,
    mapping: NamespaceMapping,
}

impl CommandDispatcher {
    /// Fails (configuration error) if `command` cannot be made invocable.
    /// Every job runs this command; the job's own `spec.command` is not consulted.
    pub fn new(command: &Path, mapping: NamespaceMapping) -> Result<Self> {
        ensure_invocable(command)?;
        Ok(Self {
            command: command.to_path_buf(),
            mapping,
        })
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    fn build_command(&self, job: &Job) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(command_args(job))
            .envs(self.mapping.command_env(job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Dispatch for CommandDispatcher {
    fn dispatch(&self, job: &Job) -> Outcome {
        let mut cmd = self.build_command(job);
        info!("Processing file: {}", job.file_path.display());
        debug!(
            "Command: {} {}",
            self.command.display(),
            command_args(job)
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        match cmd.output() {
            Ok(output) if output.status.success() => {
                info!(
                    "Processing completed successfully for: {}",
                    job.file_path.display()
                );
                debug!("Command output: {}", String::from_utf8_lossy(&output.stdout));
                Outcome::Success
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                error!(
                    "Error processing file {}: {}",
                    job.file_path.display(),
                    output.status
                );
                error!("Command stderr: {}", stderr.trim_end());
                Outcome::Failure(failure_text(&stderr, output.status))
            }
            Err(e) => {
                error!(
                    "Unexpected error processing file {}: {}",
                    job.file_path.display(),
                    e
                );
                Outcome::Failure(format!("failed to run {}: {e}", self.command.display()))
            }
        }
    }
}
