use thiserror::Error;

/// Failure of a single remote model call.
///
/// Transport, auth, quota and malformed-response failures all collapse into
/// this one shape; only the message differs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Errors surfaced to the operator by workbench commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkbenchError {
    /// Empty required input or a missing prerequisite stage output
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or rejected API key
    #[error("{0}")]
    Credential(String),

    #[error("{0}")]
    Gateway(#[from] GatewayError),
}

impl WorkbenchError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Short label used when rendering the error in the console
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Credential(_) => "credential",
            Self::Gateway(_) => "model call",
        }
    }
}

pub type WorkbenchResult<T> = Result<T, WorkbenchError>;
