use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarrcheckError {
    #[error("Audio decoding failed: {0}")]
    Decode(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NarrcheckError>;

/// Why a single unit was skipped. Never aborts the batch.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Couldn't parse chapter and section IDs from filename: {filename}")]
    FilenameParse { filename: String },

    #[error("Failed to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    #[error("Failed to read companion text {}: {source}", .path.display())]
    TextRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker for {} failed: {message}", .path.display())]
    Worker { path: PathBuf, message: String },

    #[error("Cancelled before {} was analyzed", .path.display())]
    Cancelled { path: PathBuf },
}
