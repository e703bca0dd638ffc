use chatline_client::TransportError;
use http::StatusCode;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("response body is empty")]
    EmptyBody,
    #[error("{status} {status_text}")]
    HttpStatus {
        status: StatusCode,
        status_text: String,
    },
    #[error("server replied without streaming: {server_message}")]
    NonStreamingResponse { server_message: String },
    #[error("malformed event `{line}`: {reason}")]
    MalformedEvent { line: String, reason: String },
    #[error("stream cancelled")]
    Cancelled,
    #[error("idle timeout waiting for event stream")]
    IdleTimeout,
    #[error("remote id for `{local_id}` never resolved: {source}")]
    ResolutionFailed {
        local_id: String,
        #[source]
        source: Arc<ApiError>,
    },
    #[error("thread `{local_id}` was deleted")]
    ThreadDeleted { local_id: String },
    #[error("unexpected response from {endpoint}: {reason}")]
    InvalidResponse {
        endpoint: &'static str,
        reason: String,
    },
    #[error("message codec error: {0}")]
    Codec(String),
    #[error("local hook failed: {0}")]
    LocalHook(String),
    #[error(transparent)]
    Transport(TransportError),
}

impl ApiError {
    pub(crate) fn http_status(status: StatusCode) -> Self {
        Self::HttpStatus {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
        }
    }

    pub(crate) fn invalid_response(endpoint: &'static str, err: impl ToString) -> Self {
        Self::InvalidResponse {
            endpoint,
            reason: err.to_string(),
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Http { status, .. } => Self::http_status(status),
            other => Self::Transport(other),
        }
    }
}
