use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub const RATE_LIMIT_MESSAGE: &str =
    "Rate limit exceeded. Please try again tomorrow or use your Hugging Face Pro token.";

/// Errors surfaced to a destination or to the HTTP caller.
///
/// Every variant is scoped to the single backend call (or single submission)
/// that produced it; none is process-fatal.
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{message}")]
    RateLimitExceeded { message: String },

    #[error("Backend {backend} failed: {source}")]
    Backend {
        backend: String,
        #[source]
        source: BackendFailure,
    },

    #[error("Superseded by a newer submission")]
    Superseded,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Underlying cause of a failed streaming call.
#[derive(Debug, Error)]
pub enum BackendFailure {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("event stream broken: {0}")]
    Stream(String),

    #[error("malformed chunk ({reason}): {data}")]
    Malformed { data: String, reason: String },

    #[error("backend reported: {0}")]
    Api(String),
}

impl ExplorerError {
    pub fn rate_limited() -> Self {
        Self::RateLimitExceeded {
            message: RATE_LIMIT_MESSAGE.to_string(),
        }
    }

    pub fn backend(backend: impl Into<String>, source: impl Into<BackendFailure>) -> Self {
        Self::Backend {
            backend: backend.into(),
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Backend { .. } => StatusCode::BAD_GATEWAY,
            Self::Superseded => StatusCode::CONFLICT,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ExplorerError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;
