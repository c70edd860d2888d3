use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("The given file ({path}) does not exist.")]
    FileNotFound { path: PathBuf },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid config: {message}")]
    ConfigInvalid { message: String },

    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("Malformed GUID database {path}: {message}")]
    GuidDatabase { path: PathBuf, message: String },

    #[error("Malformed WiX file {path}: {message}")]
    Wxs { path: PathBuf, message: String },

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Can't find release in {path}")]
    ReleaseNotesNotFound { path: PathBuf },

    #[error("{count} installer component(s) have no registered GUID")]
    IntegrityCheck { count: usize },

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TaskError>;
