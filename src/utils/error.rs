use crate::domain::model::{Stage, StepState};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Invalid discovery request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Illegal step transition for {stage}: cannot {action} while {from}")]
    StepTransition {
        stage: Stage,
        from: StepState,
        action: &'static str,
    },

    #[error("Discovery cancelled after {} completed stage(s)", .completed.len())]
    Cancelled { completed: Vec<Stage> },

    #[error("Configuration error in {field}: {message}")]
    ConfigError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Request,
    Contract,
    Interrupted,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReconError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReconError::InvalidRequest { .. } => ErrorCategory::Request,
            ReconError::StepTransition { .. } => ErrorCategory::Contract,
            ReconError::Cancelled { .. } => ErrorCategory::Interrupted,
            ReconError::ConfigError { .. }
            | ReconError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            ReconError::IoError(_) | ReconError::HttpError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Interrupted => ErrorSeverity::Medium,
            ErrorCategory::Request | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Contract | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ReconError::InvalidRequest { reason } => format!("Cannot start discovery: {}", reason),
            ReconError::StepTransition { stage, .. } => {
                format!("Internal error while tracking {}", stage)
            }
            ReconError::Cancelled { .. } => {
                "Discovery was cancelled before it finished".to_string()
            }
            ReconError::ConfigError { field, .. }
            | ReconError::InvalidConfigValueError { field, .. } => {
                format!("Configuration problem with '{}'", field)
            }
            ReconError::IoError(e) => format!("File system error: {}", e),
            ReconError::HttpError(e) => format!("Could not set up HTTP client: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Request => {
                "Pass a non-empty target domain, e.g. `keyword-recon example.com`"
            }
            ErrorCategory::Contract => {
                "This is a bug in keyword-recon; please report it with the progress log"
            }
            ErrorCategory::Interrupted => "Run the discovery again and let it finish",
            ErrorCategory::Configuration => "Check the config file and command-line flags",
            ErrorCategory::System => "Check file permissions and TLS setup, then retry",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;

/// Primary-path failure of a lookup. Always absorbed by the fallback combinator.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("no usable entries returned")]
    Empty,
}

impl From<serde_json::Error> for LookupError {
    fn from(e: serde_json::Error) -> Self {
        LookupError::Malformed(e.to_string())
    }
}
