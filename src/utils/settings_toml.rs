//! Load `.eegwatch.toml` from the monitored directory (CLI only). Library callers build [`Opts`] directly.
//! Nothing here logs: problems are handed back so they can be reported once logging is set up.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{Opts, RetryLimit};

#[derive(Debug, Default, Deserialize)]
pub struct EegwatchToml {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    namespace: NamespaceSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    db_path: Option<String>,
    extensions: Option<Vec<String>>,
    script: Option<String>,
    task: Option<String>,
    config: Option<String>,
    output: Option<String>,
    work_dir: Option<String>,
    max_workers: Option<usize>,
    /// Number, or the string `"unlimited"`.
    max_retries: Option<toml::Value>,
    recursive: Option<bool>,
    import_legacy: Option<bool>,
    verbose: Option<bool>,
}

/// Local mount prefixes for namespace mapping.
#[derive(Debug, Default, Deserialize)]
struct NamespaceSection {
    input_prefix: Option<String>,
    output_prefix: Option<String>,
    config_prefix: Option<String>,
    autoclean_prefix: Option<String>,
}

/// Parse settings from a TOML string.
pub fn parse_eegwatch_toml(s: &str) -> Result<EegwatchToml, toml::de::Error> {
    toml::from_str(s)
}

/// Load `.eegwatch.toml` from `dir`. Ok(None) if there is no such file; Err if it cannot be read
/// or parsed.
pub fn load_eegwatch_toml(dir: &Path) -> Result<Option<EegwatchToml>> {
    let path = dir.join(PackagePaths::get().settings_filename());
    if !path.is_file() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let file = parse_eegwatch_toml(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(file))
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Same as `apply_file_opt!` for optional path fields.
macro_rules! apply_file_path {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(ref p) = $sec.$sec_field {
            $opts.$opts_field = Some(PathBuf::from(p));
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
/// `reset_tracking` and `once` are never read from the file.
/// Returns a message for every value that was present but ignored.
pub fn apply_file_to_opts(file: &EegwatchToml, opts: &mut Opts) -> Vec<String> {
    let mut ignored = Vec::new();
    let sec = &file.settings;
    apply_file_path!(sec, opts, db_path => db_path);
    if let Some(ref v) = sec.extensions {
        opts.extensions = v.clone();
    }
    apply_file_path!(sec, opts, script => script);
    if let Some(ref t) = sec.task {
        opts.task = Some(t.clone());
    }
    apply_file_path!(sec, opts, config => config);
    apply_file_path!(sec, opts, output => output);
    apply_file_path!(sec, opts, work_dir => work_dir);
    apply_file_opt!(sec, opts, max_workers => max_workers);
    if let Some(ref v) = sec.max_retries {
        match retry_limit_from_value(v) {
            Some(limit) => opts.max_retries = limit,
            None => ignored.push(format!("ignoring invalid max_retries in settings file: {v}")),
        }
    }
    apply_file_opt!(sec, opts, recursive => recursive);
    apply_file_opt!(sec, opts, import_legacy => import_legacy);
    apply_file_opt!(sec, opts, verbose => verbose);

    let ns = &file.namespace;
    let prefixes = &mut opts.namespace_prefixes;
    if let Some(ref p) = ns.input_prefix {
        prefixes.input = PathBuf::from(p);
    }
    if let Some(ref p) = ns.output_prefix {
        prefixes.output = PathBuf::from(p);
    }
    if let Some(ref p) = ns.config_prefix {
        prefixes.config = PathBuf::from(p);
    }
    if let Some(ref p) = ns.autoclean_prefix {
        prefixes.autoclean = PathBuf::from(p);
    }
    ignored
}

fn retry_limit_from_value(v: &toml::Value) -> Option<RetryLimit> {
    match v {
        toml::Value::Integer(n) => u32::try_from(*n).ok().map(RetryLimit::Limited),
        toml::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
