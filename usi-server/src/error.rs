use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::message::ErrorBody;

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed validation.
    #[error("{0}")]
    Validation(String),
    /// The engine pool is shut down or unhealthy.
    #[error("Engine pool not available")]
    Unavailable,
    /// The analysis could not be run.
    #[error("Analysis failed: {0}")]
    Analysis(#[source] usi_client::Error),
    /// The mate search could not be run.
    #[error("Mate search failed: {0}")]
    MateSearch(#[source] usi_client::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Analysis(_) | ApiError::MateSearch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn analysis(err: usi_client::Error) -> Self {
        match err {
            usi_client::Error::PoolClosed => ApiError::Unavailable,
            other => ApiError::Analysis(other),
        }
    }

    pub(crate) fn mate_search(err: usi_client::Error) -> Self {
        match err {
            usi_client::Error::PoolClosed => ApiError::Unavailable,
            other => ApiError::MateSearch(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::analysis(usi_client::Error::PoolClosed).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        let write = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = ApiError::analysis(usi_client::Error::CommandWrite(write));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("Analysis failed:"));
    }
}
