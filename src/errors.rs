use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::GenerationError;
use crate::services::{PaymentError, StoreError, TokenError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Payment required")]
    PaymentRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Payment provider error: {0}")]
    Payment(#[from] PaymentError),

    #[error("User store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(errors) => {
                let status = StatusCode::BAD_REQUEST;
                let body = Json(json!({
                    "error": "Validation failed",
                    "status": status.as_u16(),
                    "fields": field_messages(errors),
                }));
                return (status, body).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::PaymentRequired => (
                StatusCode::PAYMENT_REQUIRED,
                "Payment required to use the generator".to_string(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.clone()),
            AppError::Generation(GenerationError::MissingApiKey) => {
                tracing::error!("Generation requested but no Gemini API key is configured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "API key is missing".to_string(),
                )
            }
            AppError::Generation(err) => {
                tracing::error!("Generation failed: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    "Could not reach the analysis service. Please try again.".to_string(),
                )
            }
            AppError::Payment(PaymentError::NotConfigured) => {
                tracing::error!("Mercado Pago access token is not configured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Payment provider is not configured".to_string(),
                )
            }
            AppError::Payment(err) => {
                tracing::error!("Payment provider error: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    "Payment provider request failed".to_string(),
                )
            }
            AppError::Store(StoreError::DuplicateEmail) => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            AppError::Store(StoreError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
            }
            AppError::Store(err) => {
                tracing::error!("User store error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "User store error occurred".to_string(),
                )
            }
            AppError::Token(TokenError::Invalid(_)) => {
                (StatusCode::UNAUTHORIZED, "invalid token".to_string())
            }
            AppError::Token(err) => {
                tracing::error!("Token error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Could not issue token".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Flattens validator errors into `{ field: [messages] }`.
pub fn field_messages(errors: &validator::ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid {}", field))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::PaymentRequired, StatusCode::PAYMENT_REQUIRED),
            (
                AppError::Generation(GenerationError::MissingApiKey),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AppError::Generation(GenerationError::Malformed("x".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (AppError::Store(StoreError::DuplicateEmail), StatusCode::CONFLICT),
            (
                AppError::Store(StoreError::InvalidCredentials),
                StatusCode::UNAUTHORIZED,
            ),
            (
                AppError::Payment(PaymentError::NotConfigured),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
