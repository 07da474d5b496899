use axum::{Json, extract::rejection::QueryRejection, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;
use super::validation::RequestValidationError;
use crate::alerts::AlertError;
use crate::ledger::LedgerError;
use crate::notify::NotifyError;
use crate::registry::RegistryError;
use crate::threads::ThreadError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload too large: limit is {0} bytes")]
    PayloadTooLarge(usize),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    ConfigurationMissing(String),
    #[error("{message}")]
    Orphaned { message_id: String, message: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Orphaned { .. } => StatusCode::BAD_GATEWAY,
            ApiError::ConfigurationMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "VALIDATION_ERROR",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Upstream(_) => "UPSTREAM_FAILURE",
            ApiError::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
            ApiError::Orphaned { .. } => "ORPHANED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            external_message_id: match self {
                ApiError::Orphaned { message_id, .. } => Some(message_id),
                _ => None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::InvalidPayload(value.body_text())
    }
}

impl From<RequestValidationError> for ApiError {
    fn from(value: RequestValidationError) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(what) => ApiError::NotFound(what),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AlertError> for ApiError {
    fn from(value: AlertError) -> Self {
        match value {
            AlertError::Ledger(e) => e.into(),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::NotFound(id) => ApiError::NotFound(format!("webhook {id}")),
        }
    }
}

impl From<NotifyError> for ApiError {
    fn from(value: NotifyError) -> Self {
        match value {
            NotifyError::InvalidTarget(e) => ApiError::InvalidPayload(e.to_string()),
            NotifyError::ConfigurationMissing(_) | NotifyError::ThreadsUnsupported => {
                ApiError::ConfigurationMissing(value.to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<ThreadError> for ApiError {
    fn from(value: ThreadError) -> Self {
        let message = value.to_string();
        match value {
            ThreadError::NotFound(id) => ApiError::NotFound(format!("thread {id}")),
            ThreadError::ConfigurationMissing => ApiError::ConfigurationMissing(message),
            ThreadError::Channel(e) => e.into(),
            ThreadError::Ledger(e) => e.into(),
            ThreadError::Orphaned { message_id, .. } => ApiError::Orphaned {
                message_id,
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Upstream("channel_not_found".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::ConfigurationMissing("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_upstream_message_is_verbatim() {
        let err: ApiError = NotifyError::Api("channel_not_found".into()).into();
        assert_eq!(err.code(), "UPSTREAM_FAILURE");
        assert_eq!(err.to_string(), "notification channel error: channel_not_found");
    }

    #[test]
    fn test_orphaned_keeps_message_id() {
        let err: ApiError = ThreadError::Orphaned {
            message_id: "1700000000.000001".into(),
            source: LedgerError::Unavailable("disk full".into()),
        }
        .into();

        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        match err {
            ApiError::Orphaned { message_id, message } => {
                assert_eq!(message_id, "1700000000.000001");
                assert!(message.contains("disk full"));
            }
            other => panic!("expected orphaned, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_target_is_validation_error() {
        let err: ApiError = NotifyError::InvalidTarget(crate::notify::TargetUrlError::EmptySegment)
            .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
