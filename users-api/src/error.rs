use std::fmt::Display;

use axum::{
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Failure of a single request, carrying the HTTP status it maps to.
///
/// Validation and lookup failures are built with [`ApiError::bad_request`] and
/// [`ApiError::not_found`]; anything unexpected goes through
/// [`ApiError::internal`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    status: u16,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(detail: impl Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal server error: {detail}"),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: self.status.as_u16(),
            message: &self.message,
        };
        // A hand-written fallback keeps the JSON shape even if encoding fails.
        let encoded = serde_json::to_vec(&body).unwrap_or_else(|_| {
            br#"{"status":500,"message":"Internal server error"}"#.to_vec()
        });
        (
            self.status,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            encoded,
        )
            .into_response()
    }
}
