//! Error taxonomy for the IGDB cache pipeline
//!
//! Every failure surfaced by a pipeline stage is one of four classes. All of
//! them are fatal to the entry point that raised them.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Credentials are missing or were rejected by the token endpoint
    #[error("{0}")]
    Auth(String),

    /// The catalog could not be fetched or committed; the previous cache is untouched
    #[error("{message}")]
    Fetch { message: String, attempts: u32 },

    /// The cache artifact is missing or malformed
    #[error("{0}")]
    Input(String),

    /// The bucket tree or index could not be written
    #[error("{0}")]
    Partition(String),
}

impl PipelineError {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a fetch error that is not tied to a retried request
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch {
            message: msg.into(),
            attempts: 0,
        }
    }

    /// Create a fetch error after `attempts` tries of a single request
    pub fn fetch_exhausted(msg: impl Into<String>, attempts: u32) -> Self {
        Self::Fetch {
            message: msg.into(),
            attempts,
        }
    }

    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a partition error
    pub fn partition(msg: impl Into<String>) -> Self {
        Self::Partition(msg.into())
    }

    /// Classification printed by the binaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "AuthError",
            Self::Fetch { .. } => "FetchError",
            Self::Input(_) => "InputError",
            Self::Partition(_) => "PartitionError",
        }
    }

    /// One-line summary: `<Classification>: <cause>`
    pub fn summary(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}
