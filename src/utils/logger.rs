use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Install the global logger. `RUST_LOG` still applies; our crate logs at debug when verbose.
/// Safe to call more than once (later calls are ignored).
pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let stamp = chrono::Local::now().format("%H:%M:%S");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        _ => "ERROR".red(),
                    };
                    let target = record.target().to_string().white();
                    format!(
                        "{} [{} {} {}] {}",
                        stamp,
                        name.cyan(),
                        level_str,
                        target,
                        record.args()
                    )
                }
                Level::Debug | Level::Trace => {
                    format!("{} [{}] {}", stamp, name.cyan(), record.args()).dimmed().to_string()
                }
                Level::Info => format!("{} [{}] {}", stamp, name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}
