//! Mapping of goal errors onto HTTP responses.

use std::time::Duration;

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::goals::GoalError;

use super::types::ErrorResponse;

/// An error response: status plus `{error, message, kind}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    kind: &'static str,
    retry_after: Option<Duration>,
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
            kind: "not_found",
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            kind: "validation_error",
            retry_after: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// HTTP status for each failure class.
pub fn status_for(err: &GoalError) -> StatusCode {
    match err {
        GoalError::Validation(_) => StatusCode::BAD_REQUEST,
        GoalError::DependencyBlocked { .. } => StatusCode::CONFLICT,
        GoalError::ProviderRateLimited { .. } | GoalError::ProviderQuotaExceeded(_) => {
            StatusCode::TOO_MANY_REQUESTS
        }
        GoalError::StoreUnavailable(_)
        | GoalError::ProviderUnconfigured(_)
        | GoalError::ProviderInvalidCredentials(_) => StatusCode::SERVICE_UNAVAILABLE,
        GoalError::Store(_)
        | GoalError::Provider(_)
        | GoalError::DecompositionFormat(_)
        | GoalError::CyclicDependency { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_title(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "Invalid request",
        StatusCode::NOT_FOUND => "Not found",
        StatusCode::CONFLICT => "Task is blocked",
        StatusCode::TOO_MANY_REQUESTS => "AI service is busy",
        StatusCode::SERVICE_UNAVAILABLE => "Service unavailable",
        _ => "Internal server error",
    }
}

impl From<GoalError> for ApiError {
    fn from(err: GoalError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            tracing::error!(kind = err.kind(), "Request failed: {}", err);
        } else {
            tracing::debug!(kind = err.kind(), "Request rejected: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
            kind: err.kind(),
            retry_after: err.retry_after(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: error_title(self.status).to_string(),
            message: self.message,
            kind: self.kind.to_string(),
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(wait) = self.retry_after {
            let secs = wait.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
