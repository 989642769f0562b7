//! Eegwatch CLI: watch a directory and process new data files until Ctrl+C (or once with --once).

use anyhow::Result;
use clap::Parser;
use eegwatch::engine::arg_parser::Cli;
use eegwatch::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
