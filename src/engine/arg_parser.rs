use clap::Parser;
use std::path::PathBuf;

use crate::RetryLimit;

/// Watch a directory for new EEG data files and process each with an external pipeline command.
#[derive(Clone, Parser)]
#[command(name = "eegwatch")]
#[command(
    about = "Monitor a directory for new EEG data files and process them with an external command."
)]
pub struct Cli {
    /// Directory to monitor for new data files.
    #[arg(long, short = 'd', value_name = "DIR")]
    pub dir: PathBuf,

    /// Data file extensions to monitor (e.g. edf set vhdr). Leading dot optional.
    #[arg(long, short = 'e', num_args = 1..)]
    pub extensions: Vec<String>,

    /// Path to the processing script.
    #[arg(long, short = 's')]
    pub script: Option<PathBuf>,

    /// Processing task type (RestingEyesOpen, ASSR, ChirpDefault, ...).
    #[arg(long, short = 't')]
    pub task: Option<String>,

    /// Path to the pipeline configuration file.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Output directory for processed files.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Working directory for the pipeline. Omit to call the command without -WorkDir.
    #[arg(long = "work-dir", visible_alias = "work_dir", short = 'w')]
    pub work_dir: Option<PathBuf>,

    /// Maximum number of concurrent processing tasks. Default: 3.
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Maximum failed attempts per file, or `unlimited`. Default: 3.
    #[arg(long)]
    pub max_retries: Option<RetryLimit>,

    /// Clear tracking records and reprocess all files.
    #[arg(long)]
    pub reset_tracking: bool,

    /// Scan and watch subdirectories too.
    #[arg(long, short = 'r', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub recursive: Option<bool>,

    /// Path to the tracking database. Default: `.eegwatch` in DIR.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Import processed_files.csv / error_files.csv from DIR into the tracking database.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub import_legacy: Option<bool>,

    /// Process existing files, wait for them to finish, and exit without watching.
    #[arg(long)]
    pub once: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
