//! CLI command handler: merge settings, validate, run the watchdog.

use anyhow::{Context, Result, bail};
use log::{debug, warn};

use crate::Opts;
use crate::engine::arg_parser::Cli;
use crate::run::{log_run_config, run_watchdog};
use crate::utils::{apply_file_to_opts, load_eegwatch_toml, setup_logging};

/// Overwrite opts field from CLI when given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $cli_field:ident => Some $opts_field:ident) => {
        if let Some(ref v) = $cli.$cli_field {
            $opts.$opts_field = Some(v.clone());
        }
    };
    ($cli:expr, $opts:expr, $field:ident) => {
        if let Some(ref v) = $cli.$field {
            $opts.$field = v.clone();
        }
    };
}

/// Defaults, then `.eegwatch.toml` from the monitored directory, then CLI.
/// Also returns settings file problems (malformed file, ignored values) for the caller to log.
pub fn opts_from_cli(cli: &Cli) -> (Opts, Vec<String>) {
    let mut opts = Opts {
        dir: cli.dir.clone(),
        ..Opts::default()
    };
    let mut settings_warnings = Vec::new();
    match load_eegwatch_toml(&cli.dir) {
        Ok(Some(file)) => settings_warnings.extend(apply_file_to_opts(&file, &mut opts)),
        Ok(None) => {}
        Err(e) => settings_warnings.push(format!("{e:#}; settings file ignored")),
    }
    if !cli.extensions.is_empty() {
        opts.extensions = cli.extensions.clone();
    }
    apply_cli_opt!(cli, opts, db => Some db_path);
    apply_cli_opt!(cli, opts, script => Some script);
    apply_cli_opt!(cli, opts, task => Some task);
    apply_cli_opt!(cli, opts, config => Some config);
    apply_cli_opt!(cli, opts, output => Some output);
    apply_cli_opt!(cli, opts, work_dir => Some work_dir);
    apply_cli_opt!(cli, opts, max_workers);
    apply_cli_opt!(cli, opts, max_retries);
    apply_cli_opt!(cli, opts, recursive);
    apply_cli_opt!(cli, opts, import_legacy);
    apply_cli_opt!(cli, opts, verbose);
    opts.reset_tracking = cli.reset_tracking;
    opts.once = cli.once;
    (opts, settings_warnings)
}

/// Startup checks. Any error here is a configuration error: the process exits before watching.
/// Makes the script path absolute so it is never looked up on `PATH`.
pub fn validate_opts(opts: &mut Opts) -> Result<()> {
    if !opts.dir.is_dir() {
        bail!("monitored directory does not exist: {}", opts.dir.display());
    }
    if opts.extensions.iter().all(|e| e.trim().trim_start_matches('.').is_empty()) {
        bail!("at least one file extension is required (--extensions)");
    }
    if opts.max_workers == 0 {
        bail!("--max-workers must be at least 1");
    }
    let spec = opts.job_spec()?;
    if !spec.command.is_file() {
        bail!("processing script not found: {}", spec.command.display());
    }
    if !spec.config_path.exists() {
        bail!("config file not found: {}", spec.config_path.display());
    }
    if spec.task.trim().is_empty() {
        bail!("--task must not be empty");
    }
    let script = spec
        .command
        .canonicalize()
        .with_context(|| format!("resolve script path {}", spec.command.display()))?;
    opts.script = Some(script);
    Ok(())
}

/// Run the watchdog from parsed CLI arguments.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let (mut opts, settings_warnings) = opts_from_cli(cli);
    setup_logging(opts.verbose);
    for w in &settings_warnings {
        warn!("{w}");
    }
    validate_opts(&mut opts)?;
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);
    log_run_config(&opts);
    run_watchdog(&opts)?;
    Ok(())
}
