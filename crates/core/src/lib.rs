mod config;
mod error;
mod filter;
mod mode;
mod naming;
mod processor;

pub use config::{
    app_paths, load_config, save_config, AppConfig, AppPaths, DEFAULT_OUTPUT_DIR_NAME,
};
pub use error::{ConfigError, ProcessError};
pub use filter::FileFilter;
pub use mode::{parse_start_number, EditScope, ModeOptions, RenameMode, ResequenceStrategy};
pub use naming::{
    case_insensitive_replace, format_file_size, format_size, list_available_extensions,
    split_name, unique_path,
};
pub use processor::{BatchProcessor, FileEntry, FileOutcome, LogSink, ProcessingResult};
