//! # error
//!
//! Centralised application error type.
//!
//! Every handler returns `Result<_, AppError>`.  Axum's `IntoResponse` impl
//! converts these into structured JSON error bodies so the frontend always
//! gets a machine-readable response even on failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// The trade request supplied neither amount nor grams, both at once,
    /// or a non-positive value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The submitted date failed normalization or is not a real calendar date.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The submitted gold rate is empty, non-numeric or not positive.
    #[error("Invalid rate: {0}")]
    InvalidRate(String),

    /// A sell would drive the held grams below zero.
    #[error("Insufficient gold balance: {0}")]
    InsufficientBalance(String),

    /// The date already has a settled transaction.
    #[error("Duplicate trade: {0}")]
    DuplicateTrade(String),

    /// The requested resource (e.g. a rate observation) does not exist yet.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The realtime store rejected or failed a read/write.
    #[error("Store error: {0}")]
    Store(String),

    /// Catch-all for unexpected failures.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidDate(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidRate(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InsufficientBalance(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::DuplicateTrade(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Store(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Failed to save: {msg}"),
            ),
            AppError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {err}"),
            ),
        };

        let body = Json(json!({
            "ok":    false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
