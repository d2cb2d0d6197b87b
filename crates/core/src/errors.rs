use thiserror::Error;

use crate::domain::deal::{DealId, DealStatus};

/// Malformed negotiation configuration. Fatal at config-build time; a
/// validated config can no longer fail mid-negotiation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("accept_threshold ({accept}) must be greater than walkaway_threshold ({walkaway})")]
    ThresholdOrder { accept: String, walkaway: String },
    #[error("parameter {name}: {message}")]
    Parameter { name: String, message: String },
    #[error("max_rounds must be at least 1")]
    MaxRounds,
    #[error("config has no parameters")]
    Empty,
    #[error("unreadable config source: {0}")]
    Source(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid deal transition from {from:?} to {to:?}")]
    InvalidDealTransition { from: DealStatus, to: DealStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Persistence collaborator failure. The core never inspects backend
/// detail beyond the message; retries are the caller's business.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("backend failure: {0}")]
    Backend(String),
    #[error("decode failure: {0}")]
    Decode(String),
}

/// Errors surfaced from a negotiation session to the service layer.
/// Collaborator timeouts never appear here: the response generator always
/// resolves them to the fallback path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("deal {0:?} not found")]
    NotFound(DealId),
    #[error("deal {deal:?} is not open for negotiation (status {status:?})")]
    InvalidState { deal: DealId, status: DealStatus },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_flows_into_session_error() {
        let err = SessionError::from(StoreError::Backend("database lock timeout".to_owned()));
        assert!(matches!(err, SessionError::Store(StoreError::Backend(_))));
    }

    #[test]
    fn config_error_renders_thresholds() {
        let err = ConfigError::ThresholdOrder {
            accept: "0.40".to_owned(),
            walkaway: "0.45".to_owned(),
        };
        assert!(err.to_string().contains("0.40"));
        assert!(err.to_string().contains("0.45"));
    }
}
