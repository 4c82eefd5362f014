//! Error types for model building

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a country's pipeline run.
///
/// Data-quality problems (illegal or unreadable passwords) are not errors:
/// the aggregator counts them and moves on.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Corpus file {path} is not a JSON array of records: {source}")]
    CorpusFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corpus directory not found: {0}")]
    MissingCorpus(PathBuf),

    #[error("Count dictionary {path} could not be read: {message}")]
    CountFormat { path: PathBuf, message: String },

    #[error("Frequency table is empty, cannot build a distribution")]
    EmptyTable,

    #[error("Invalid compression ratio {0}: must be a positive integer")]
    InvalidRatio(u64),

    #[error("Unknown component '{0}'. Valid: prefix, base_word, suffix, shift_pattern, leet_pattern")]
    UnknownComponent(String),

    #[error("Worker for {country} failed: {message}")]
    Worker { country: String, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ModelError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ModelError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
