use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolarFinanceError {
    #[error("Invalid parameter: {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Remote engine timed out during {stage} after {seconds}s")]
    RemoteTimeout { stage: String, seconds: u64 },

    #[error("Remote engine unreachable: {0}")]
    RemoteConnectivity(String),

    #[error("Remote engine protocol violation: {0}")]
    RemoteProtocol(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse failure category surfaced to callers that only need to branch on the class
/// of failure (retry prompt, form highlight, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Computation,
    Timeout,
    Connectivity,
    Protocol,
    Configuration,
}

impl SolarFinanceError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        SolarFinanceError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SolarFinanceError::InvalidParameter { .. } => ErrorKind::InvalidInput,
            SolarFinanceError::Computation(_) => ErrorKind::Computation,
            SolarFinanceError::RemoteTimeout { .. } => ErrorKind::Timeout,
            SolarFinanceError::RemoteConnectivity(_) => ErrorKind::Connectivity,
            SolarFinanceError::RemoteProtocol(_) | SolarFinanceError::Serialization(_) => {
                ErrorKind::Protocol
            }
            SolarFinanceError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// The one human-readable line shown for a failed run.
    pub fn user_message(&self) -> String {
        match self {
            SolarFinanceError::InvalidParameter { field, reason } => {
                format!("Please review the project inputs: {field} {reason}.")
            }
            SolarFinanceError::Computation(_) => {
                "The financial calculation failed unexpectedly. Please report this issue.".into()
            }
            SolarFinanceError::RemoteTimeout { .. } => {
                "The calculation service took too long to respond. Please try again.".into()
            }
            SolarFinanceError::RemoteConnectivity(_) => {
                "Could not reach the calculation service. Check your connection and try again."
                    .into()
            }
            SolarFinanceError::RemoteProtocol(_) | SolarFinanceError::Serialization(_) => {
                "The calculation service returned an incomplete or malformed response.".into()
            }
            SolarFinanceError::Configuration(msg) => format!("Invalid engine configuration: {msg}"),
        }
    }

    /// Remote failures after which an embedded run is a meaningful substitute.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Timeout | ErrorKind::Connectivity | ErrorKind::Protocol
        )
    }
}

impl From<serde_json::Error> for SolarFinanceError {
    fn from(e: serde_json::Error) -> Self {
        SolarFinanceError::Serialization(e.to_string())
    }
}
