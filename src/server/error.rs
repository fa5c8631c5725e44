//! Maps typed failures onto the HTTP status vocabulary.
//!
//! The mapping is a pure match over closed enums: 400 for bad input and
//! rejected uploads, 502 for upstream API failures, 504 for lost deadline
//! races, 500 for everything internal.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::api::ApiError;
use crate::core::{ExtractError, ReadError};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    Upload(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Input(_) | RequestError::Upload(_) => StatusCode::BAD_REQUEST,
            RequestError::Extract(ExtractError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            RequestError::Extract(ExtractError::Failed(_)) => StatusCode::BAD_REQUEST,
            RequestError::Read(_) => StatusCode::BAD_REQUEST,
            RequestError::Api(ApiError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            RequestError::Api(ApiError::MissingKey) => StatusCode::INTERNAL_SERVER_ERROR,
            RequestError::Api(_) => StatusCode::BAD_GATEWAY,
            RequestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed ({}): {}", status, self);
        } else {
            tracing::warn!("request rejected ({}): {}", status, self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_mapping_covers_the_full_vocabulary() {
        assert_eq!(
            RequestError::Input("empty".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RequestError::Upload("too big".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RequestError::from(ExtractError::Timeout(Duration::from_secs(1))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            RequestError::from(ExtractError::Failed("corrupt".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RequestError::from(ApiError::Timeout(Duration::from_secs(1))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            RequestError::from(ApiError::Upstream {
                status: 429,
                detail: "quota".into()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RequestError::from(ApiError::MissingKey).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RequestError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_detail_passes_through_to_the_message() {
        let err = RequestError::from(ApiError::Upstream {
            status: 429,
            detail: "RESOURCE_EXHAUSTED: quota exceeded".into(),
        });
        assert!(err.to_string().contains("quota exceeded"));
    }
}
