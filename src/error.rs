use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::config::RuntimeMode;
use crate::providers::ProviderError;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    EmptyResult(&'static str),

    #[error("Provider call did not complete within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Provider(_) | AppError::EmptyResult(_) | AppError::Timeout(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Provider(e) => e.kind(),
            AppError::EmptyResult(_) => "EmptyResultError",
            AppError::Timeout(_) => "TimeoutError",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Error envelope returned to callers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.body.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn log_failure(route: &'static str, err: &AppError) {
    tracing::error!(
        route,
        kind = err.kind(),
        error = %err,
        "Request failed"
    );
}

/// `/api/tts`: validation and empty results surface their own message,
/// everything else the generic one with the failure message as `details`.
pub fn speech_failure(err: AppError) -> ApiError {
    log_failure("tts", &err);

    match err {
        AppError::Validation(message) => ApiError::new(StatusCode::BAD_REQUEST, message),
        AppError::EmptyResult(message) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, message),
        other => ApiError::new(other.status(), "Failed to synthesize speech.")
            .with_details(json!(other.to_string())),
    }
}

/// `/api/transcription`: `{ message, type }` details outside production only.
pub fn transcription_failure(err: AppError, mode: RuntimeMode) -> ApiError {
    log_failure("transcription", &err);

    let response = ApiError::new(err.status(), "Transcription failed");
    if mode.is_production() {
        response
    } else {
        response.with_details(json!({
            "message": err.to_string(),
            "type": err.kind(),
        }))
    }
}

/// `/api/product-description`: never exposes details.
pub fn product_description_failure(err: AppError) -> ApiError {
    log_failure("product-description", &err);

    ApiError::new(err.status(), "Product description generation failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_error() -> AppError {
        AppError::Provider(ProviderError::Api {
            status: Some(429),
            message: "quota exceeded".to_string(),
        })
    }

    #[test]
    fn test_status_per_kind() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(provider_error().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::EmptyResult("none").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Timeout(Duration::from_secs(300)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_timeout_is_its_own_kind() {
        let err = AppError::Timeout(Duration::from_secs(5));
        assert_eq!(err.kind(), "TimeoutError");
        assert_eq!(err.to_string(), "Provider call did not complete within 5s");
    }

    #[test]
    fn test_speech_failure_shapes() {
        let validation = speech_failure(AppError::Validation("Text to speak is required.".into()));
        assert_eq!(validation.status, StatusCode::BAD_REQUEST);
        assert_eq!(validation.body.error, "Text to speak is required.");
        assert!(validation.body.details.is_none());

        let provider = speech_failure(provider_error());
        assert_eq!(provider.body.error, "Failed to synthesize speech.");
        assert_eq!(provider.body.details, Some(json!("quota exceeded")));
    }

    #[test]
    fn test_transcription_details_are_mode_gated() {
        let dev = transcription_failure(provider_error(), RuntimeMode::Development);
        assert_eq!(
            dev.body.details,
            Some(json!({ "message": "quota exceeded", "type": "ApiError" }))
        );

        let prod = transcription_failure(provider_error(), RuntimeMode::Production);
        assert_eq!(prod.body.error, "Transcription failed");
        assert!(prod.body.details.is_none());
    }

    #[test]
    fn test_product_description_hides_details() {
        let response = product_description_failure(provider_error());
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body.details.is_none());
    }
}
