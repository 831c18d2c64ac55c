//! Error taxonomy for a single generation request.
//!
//! Every failure a caller can observe is a [`RunnerError`]. Transport and
//! API failures from the model client are wrapped in
//! [`RunnerError::Generation`] so the client's own error types never leak.

use thiserror::Error;

/// Why configuration could not produce usable settings.
///
/// Cloneable so the disabled state can be cached for the process lifetime
/// and reported again on every request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("credential not found: set {key} in the environment or the secrets file")]
    MissingCredential { key: String },

    #[error("credential is malformed: {reason}")]
    MalformedCredential { reason: String },

    #[error("failed to read configuration: {0}")]
    Source(String),
}

/// Coarse classification of a [`RunnerError`], used by the UI layers to
/// pick a status code or message style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Initialization,
    Validation,
    ContentBlocked,
    Generation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Initialization => "initialization",
            ErrorKind::Validation => "validation",
            ErrorKind::ContentBlocked => "content_blocked",
            ErrorKind::Generation => "generation",
        }
    }
}

/// Failure of a `generate` call.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Generation is disabled because configuration failed.
    #[error("generation unavailable: {0}")]
    Configuration(#[from] ConfigError),

    /// Generation is disabled because the model handle could not be built.
    #[error("generation unavailable: model initialization failed: {0}")]
    Initialization(String),

    #[error("invalid input: {0}")]
    Validation(&'static str),

    #[error("content blocked by the model service (reason: {reason})")]
    ContentBlocked { reason: String },

    #[error("generation failed: the model returned an empty response")]
    EmptyResponse,

    #[error("generation failed: {0:#}")]
    Generation(#[source] anyhow::Error),
}

impl RunnerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunnerError::Configuration(_) => ErrorKind::Configuration,
            RunnerError::Initialization(_) => ErrorKind::Initialization,
            RunnerError::Validation(_) => ErrorKind::Validation,
            RunnerError::ContentBlocked { .. } => ErrorKind::ContentBlocked,
            RunnerError::EmptyResponse | RunnerError::Generation(_) => ErrorKind::Generation,
        }
    }

    /// True when generation is disabled for the rest of the process.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Initialization
        )
    }
}
