use std::path::PathBuf;

use thiserror::Error;

/// Domain failures shared by the toolkit's three workflows
#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("{path}: line {line}: {reason}")]
    InvalidCredentials {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("no valid seller URLs found in {0}")]
    NoSellerUrls(PathBuf),

    #[error("missing input files: {}", .0.join(", "))]
    MissingInputs(Vec<String>),

    #[error("anti-bot challenge was not resolved ({0})")]
    ChallengeUnresolved(String),

    #[error("failed to load {url} after {attempts} attempts")]
    NavigationFailed { url: String, attempts: usize },

    #[error("output already exists: {0}")]
    OutputExists(PathBuf),

    #[error("seller API {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read spreadsheet {path}: {message}")]
    SpreadsheetRead { path: PathBuf, message: String },

    #[error("failed to write spreadsheet {path}: {message}")]
    SpreadsheetWrite { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ToolkitError {
    /// True when the operator chose to stop instead of solving a challenge
    pub fn is_operator_abort(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<ToolkitError>(),
            Some(ToolkitError::ChallengeUnresolved(_))
        )
    }
}

/// Result type for toolkit operations with a typed failure
pub type ToolkitResult<T> = Result<T, ToolkitError>;
