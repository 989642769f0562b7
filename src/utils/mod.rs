pub mod config;
pub mod logger;
pub mod settings_toml;

pub use config::*;
pub use logger::setup_logging;
pub use settings_toml::{apply_file_to_opts, load_eegwatch_toml, parse_eegwatch_toml};
