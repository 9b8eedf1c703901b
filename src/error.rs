// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Failure while retrieving a source file.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    ConnectionFailed { url: String, message: String },

    #[error("{url} answered with HTTP {code}")]
    HttpStatus { url: String, code: u16 },
}

impl FetchError {
    /// Classify a reqwest error. Status errors keep their code, everything
    /// that never produced a response counts as a connection failure.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout { url: url.to_string() };
        }
        if let Some(status) = err.status() {
            return Self::HttpStatus {
                url: url.to_string(),
                code: status.as_u16(),
            };
        }
        Self::ConnectionFailed {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Failure while turning raw bytes into a [`crate::process::RawTable`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("payload is not valid {encoding}")]
    Encoding { encoding: &'static str },

    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },
}

/// Failure while building or querying the dataset catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown dataset '{name}'")]
    NotFound { name: String },

    #[error("dataset '{name}': unknown encoding label '{label}'")]
    UnknownEncoding { name: String, label: String },

    #[error("dataset '{name}': separator {separator:?} must be a single ASCII character")]
    InvalidSeparator { name: String, separator: String },

    #[error("dataset '{name}': invalid url '{url}': {source}")]
    InvalidUrl {
        name: String,
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("dataset '{name}' is defined more than once")]
    Duplicate { name: String },

    #[error("invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Single structured failure for one pipeline invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to parse dataset '{dataset}': {source}")]
    Parse {
        dataset: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to store raw payload at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Whether a caller-side retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(FetchError::Timeout { .. }) => true,
            Self::Fetch(FetchError::ConnectionFailed { .. }) => true,
            Self::Fetch(FetchError::HttpStatus { code, .. }) => *code >= 500,
            _ => false,
        }
    }
}
