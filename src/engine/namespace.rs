//! Namespace mapping: rewrite paths from this process's mounts to the paths the same files have
//! on the external host (e.g. when running inside a container that launches host-side tools).

use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::engine::tools::{path_relative_to, path_to_db_string};
use crate::{Job, LocalPrefixes};

/// Host-side directories read from the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostDirs {
    pub input: String,
    pub output: String,
    pub config: String,
    pub autoclean: String,
}

impl HostDirs {
    pub const INPUT_VAR: &'static str = "INPUT_DIR";
    pub const OUTPUT_VAR: &'static str = "OUTPUT_DIR";
    pub const CONFIG_VAR: &'static str = "CONFIG_DIR";
    pub const AUTOCLEAN_VAR: &'static str = "AUTOCLEAN_DIR";

    /// Read from the process environment after loading `.env` from `dir` (real variables win).
    pub fn from_env(dir: &Path) -> Self {
        let env_path = dir.join(".env");
        if env_path.is_file() {
            match dotenvy::from_path(&env_path) {
                Ok(()) => debug!("Loaded {}", env_path.display()),
                Err(e) => warn!("{}: {}", env_path.display(), e),
            }
        }
        let var = |name: &str| std::env::var(name).unwrap_or_default().trim().to_string();
        Self {
            input: var(Self::INPUT_VAR),
            output: var(Self::OUTPUT_VAR),
            config: var(Self::CONFIG_VAR),
            autoclean: var(Self::AUTOCLEAN_VAR),
        }
    }

    pub fn is_configured(&self) -> bool {
        [&self.input, &self.output, &self.config, &self.autoclean]
            .iter()
            .any(|v| !v.is_empty())
    }

    pub fn log_summary(&self) {
        info!("Host input directory: {}", self.input);
        info!("Host output directory: {}", self.output);
        info!("Host config directory: {}", self.config);
        info!("Host autoclean directory: {}", self.autoclean);
    }
}

/// Prefix rewrite rules. Only paths under a configured local prefix are rewritten.
#[derive(Clone, Debug, Default)]
pub struct NamespaceMapping {
    host: HostDirs,
    rules: Vec<(PathBuf, String)>,
}

impl NamespaceMapping {
    pub fn new(host: HostDirs, prefixes: &LocalPrefixes) -> Self {
        let rules = [
            (&prefixes.input, &host.input),
            (&prefixes.output, &host.output),
            (&prefixes.config, &host.config),
            (&prefixes.autoclean, &host.autoclean),
        ]
        .into_iter()
        .filter(|(_, external)| !external.is_empty())
        .map(|(local, external)| (local.clone(), external.clone()))
        .collect();
        Self { host, rules }
    }

    /// No mapping: paths are never rewritten and no host variables are exported.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.host.is_configured()
    }

    pub fn host_dirs(&self) -> &HostDirs {
        &self.host
    }

    /// Rewrite `path` if it sits under a mapped local prefix. Otherwise return it unchanged
    /// (with a warning when mapping is configured).
    pub fn translate(&self, path: &Path) -> String {
        for (local, external) in &self.rules {
            if let Some(rel) = path_relative_to(path, local) {
                let base = external.trim_end_matches(['/', '\\']);
                let rel = path_to_db_string(&rel);
                let translated = if rel.is_empty() {
                    base.replace('\\', "/")
                } else {
                    format!("{base}/{rel}").replace('\\', "/")
                };
                debug!(
                    "Converted local path {} to host path {}",
                    path.display(),
                    translated
                );
                return translated;
            }
        }
        if self.is_configured() {
            warn!(
                "Could not convert path {} to host path, using as is",
                path.display()
            );
        }
        path_to_db_string(path)
    }

    /// Extra environment for the external command. Empty when mapping is not configured.
    pub fn command_env(&self, job: &Job) -> Vec<(&'static str, String)> {
        if !self.is_configured() {
            return Vec::new();
        }
        let mut env = vec![
            ("HOST_INPUT_DIR", self.host.input.clone()),
            ("HOST_OUTPUT_DIR", self.host.output.clone()),
            ("HOST_CONFIG_DIR", self.host.config.clone()),
            ("HOST_AUTOCLEAN_DIR", self.host.autoclean.clone()),
            ("HOST_FILE_PATH", self.translate(&job.file_path)),
            ("HOST_CONFIG_PATH", self.translate(&job.spec.config_path)),
            ("HOST_OUTPUT_PATH", self.translate(&job.spec.output_dir)),
        ];
        if let Some(ref work_dir) = job.spec.work_dir {
            env.push(("HOST_WORK_DIR", self.translate(work_dir)));
        }
        env
    }
}
