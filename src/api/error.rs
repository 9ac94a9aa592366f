//! HTTP error responses and the JSON body extractor.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::error::IonixError;

const GENERIC_MESSAGE: &str = "Server Error";

/// Error returned by every handler; rendered as `{ "message": ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// HTTP status for each kind of failure.
pub fn status_code(err: &IonixError) -> StatusCode {
    match err {
        IonixError::Validation(_) => StatusCode::BAD_REQUEST,
        IonixError::Auth(_) => StatusCode::UNAUTHORIZED,
        IonixError::Authorization(_) => StatusCode::FORBIDDEN,
        IonixError::NotFound(_) => StatusCode::NOT_FOUND,
        IonixError::Conflict(_) => StatusCode::CONFLICT,
        IonixError::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<IonixError> for ApiError {
    fn from(err: IonixError) -> Self {
        let status = status_code(&err);
        if err.is_client_facing() {
            return Self::new(status, err.to_string());
        }
        tracing::error!(error = %err, "request failed");
        Self::new(status, GENERIC_MESSAGE)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

/// `axum::Json` whose rejections are rendered as [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_code(&IonixError::validation("x")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code(&IonixError::unauthorized("x")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_code(&IonixError::Authorization("x".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_code(&IonixError::not_found("x")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code(&IonixError::Conflict("x".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_code(&IonixError::Upstream("x".to_string())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_internal_errors_are_hidden() {
        let err: ApiError = IonixError::Internal("disk on fire".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Server Error");

        let err: ApiError = IonixError::Conflict("User already exists".to_string()).into();
        assert_eq!(err.message, "User already exists");
    }
}
