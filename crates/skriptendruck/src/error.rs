use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkriptendruckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Batch-level failures. These are the only errors that abort a run.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid price table '{path}': {reason}")]
    PriceTable { path: PathBuf, reason: String },

    #[error("Invalid line {line} in '{path}': {reason}")]
    InvalidLine {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Input directory '{path}' is not usable: {reason}")]
    InputDirectory { path: PathBuf, reason: String },

    #[error("Cannot open results file '{path}': {source}")]
    ResultsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid filename '{filename}': {reason}")]
    InvalidFilename { filename: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to read document '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document '{path}' is not a readable PDF: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to encode cover sheet: {0}")]
    Encode(String),

    #[error("Thumbnail rendering failed: {0}")]
    Thumbnail(String),

    #[error("Failed to write cover sheet '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Failed to load '{path}' for merging: {reason}")]
    ReadInput { path: PathBuf, reason: String },

    #[error("Failed to assemble merged document: {0}")]
    Assemble(String),

    #[error("Failed to write merged document '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy file from '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Shutdown requested, order not submitted")]
    ShutdownRequested,

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

pub type Result<T> = std::result::Result<T, SkriptendruckError>;
