//! Engine module: CLI, tracking database, namespace mapping, path tools

pub mod arg_parser;
pub mod cli;
pub mod db_ops;
pub mod namespace;
pub mod tools;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use cli::{handle_run, opts_from_cli, validate_opts};
pub use db_ops::{LegacyImport, TrackingStore, import_legacy_trackers, open_db, open_db_in_memory};
pub use namespace::{HostDirs, NamespaceMapping};
pub use tools::{
    dotted_extension, is_os_hidden_file, is_tracking_db_file, normalize_extension,
    path_relative_to, path_to_db_string, truncate_chars,
};
