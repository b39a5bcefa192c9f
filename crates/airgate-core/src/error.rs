use http::StatusCode;
use serde::Serialize;

/// Trait for domain errors that can be converted to HTTP responses
///
/// The server layer turns these into the JSON error envelope, keeping
/// domain errors decoupled from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// Request parameter the error refers to, if any
    fn param(&self) -> Option<&str> {
        None
    }

    /// Short machine-readable code, if any
    fn code(&self) -> Option<&str> {
        None
    }
}

/// `{"error": {...}}` wrapper shared with upstream APIs
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_error<E: HttpError + ?Sized>(error: &E) -> Self {
        Self {
            error: ErrorBody {
                message: error.client_message(),
                kind: error.error_type().to_owned(),
                param: error.param().map(str::to_owned),
                code: error.code().map(str::to_owned),
            },
        }
    }
}
