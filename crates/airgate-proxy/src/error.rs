use airgate_core::HttpError;
use airgate_store::StoreError;
use http::StatusCode;
use thiserror::Error;

use crate::registry::ResolveError;

/// Request-level routing failures
///
/// Per-attempt upstream and transport failures never surface here on their
/// own; they are retried, replayed, or folded into [`ProxyError::BadGateway`].
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Client sent a body the router cannot read a model from
    #[error("{0}")]
    InvalidRequest(String),

    #[error("pattern '{pattern}' is invalid: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// No account currently serves the model
    #[error("no available accounts found for model '{model}'")]
    ModelNotFound { model: String },

    #[error("model '{alias}' not found")]
    AliasNotFound { alias: String },

    #[error("model '{alias}' is disabled")]
    AliasDisabled { alias: String },

    /// The alias exists but maps to nothing usable
    #[error("model '{alias}' has no associated models")]
    AliasEmpty { alias: String },

    #[error("pattern '{pattern}' matching failed: {reason}")]
    PatternNoMatch { pattern: String, reason: String },

    /// Every attempt failed without an upstream response
    #[error("all {attempts} attempts to reach an upstream account failed")]
    BadGateway { attempts: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProxyError {
    pub(crate) fn from_resolve(pattern: &str, error: ResolveError) -> Self {
        match error {
            ResolveError::Invalid { source, .. } => Self::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: source.to_string(),
            },
            ResolveError::UnknownModel { model } => Self::ModelNotFound { model },
            other @ (ResolveError::NoModels | ResolveError::NoMatch { .. }) => Self::PatternNoMatch {
                pattern: pattern.to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

impl HttpError for ProxyError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidPattern { .. } => StatusCode::BAD_REQUEST,
            Self::ModelNotFound { .. }
            | Self::AliasNotFound { .. }
            | Self::AliasDisabled { .. }
            | Self::AliasEmpty { .. }
            | Self::PatternNoMatch { .. } => StatusCode::NOT_FOUND,
            Self::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) | Self::InvalidPattern { .. } => "invalid_request_error",
            Self::ModelNotFound { .. }
            | Self::AliasNotFound { .. }
            | Self::AliasDisabled { .. }
            | Self::AliasEmpty { .. }
            | Self::PatternNoMatch { .. } => "not_found_error",
            Self::BadGateway { .. } => "forward_error",
            Self::Store(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Store(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }

    fn param(&self) -> Option<&str> {
        match self {
            Self::InvalidRequest(_) | Self::BadGateway { .. } | Self::Store(_) => None,
            _ => Some("model"),
        }
    }

    fn code(&self) -> Option<&str> {
        match self {
            Self::InvalidPattern { .. } => Some("invalid_pattern"),
            Self::ModelNotFound { .. } | Self::PatternNoMatch { .. } => Some("model_not_found"),
            Self::AliasNotFound { .. } | Self::AliasDisabled { .. } | Self::AliasEmpty { .. } => {
                Some("alias_not_found")
            }
            Self::InvalidRequest(_) | Self::BadGateway { .. } | Self::Store(_) => None,
        }
    }
}
