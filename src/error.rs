// ABOUTME: Centralized error handling for the cession signing workflow
// ABOUTME: Maps domain errors to HTTP responses without leaking internal details

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub enum AppError {
    Database(sea_orm::DbErr),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Validation(Vec<FieldError>),
    InvalidArtifactType(String),
    ArtifactTooLarge { size: usize, limit: usize },
    ArtifactEncodingFailed(String),
    SignatureImageUnavailable(String),
    StorageWriteFailed(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(err) => write!(f, "Database error: {}", err),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Validation(fields) => {
                write!(f, "Validation failed on {} field(s)", fields.len())
            }
            AppError::InvalidArtifactType(mime) => {
                write!(f, "Invalid signature artifact type: {}", mime)
            }
            AppError::ArtifactTooLarge { size, limit } => {
                write!(f, "Signature artifact too large: {} bytes (limit {})", size, limit)
            }
            AppError::ArtifactEncodingFailed(msg) => {
                write!(f, "Signature encoding failed: {}", msg)
            }
            AppError::SignatureImageUnavailable(url) => {
                write!(f, "Recorded signature image could not be loaded: {}", url)
            }
            AppError::StorageWriteFailed(msg) => write!(f, "Storage write failed: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Database(_) => {
                tracing::error!("Database error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database operation failed".to_string(),
                )
            }
            AppError::Unauthorized(msg) => {
                tracing::warn!("Unauthorized access: {}", msg);
                (StatusCode::UNAUTHORIZED, "Authentication required".to_string())
            }
            AppError::NotFound(msg) => {
                // The signing page must never reveal which token column missed.
                tracing::info!("Resource not found: {}", msg);
                (StatusCode::NOT_FOUND, "Document not found".to_string())
            }
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::Validation(fields) => {
                tracing::warn!("Validation failed: {:?}", fields);
                let body = Json(json!({
                    "error": "Validation failed",
                    "fields": fields,
                    "status": StatusCode::UNPROCESSABLE_ENTITY.as_u16()
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::InvalidArtifactType(mime) => {
                tracing::warn!("Rejected signature artifact of type {}", mime);
                (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "Signature must be an image".to_string(),
                )
            }
            AppError::ArtifactTooLarge { size, limit } => {
                tracing::warn!("Rejected oversized signature: {} > {}", size, limit);
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Signature image is too large".to_string(),
                )
            }
            AppError::ArtifactEncodingFailed(_) => {
                tracing::warn!("{}", self);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Signature could not be encoded, please retry".to_string(),
                )
            }
            AppError::SignatureImageUnavailable(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::BAD_GATEWAY,
                    "A recorded signature could not be loaded".to_string(),
                )
            }
            AppError::StorageWriteFailed(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::BAD_GATEWAY,
                    "Artifact storage failed, please retry".to_string(),
                )
            }
            AppError::Internal(_) => {
                tracing::error!("Internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
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

// Conversion implementations
impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<lopdf::Error> for AppError {
    fn from(err: lopdf::Error) -> Self {
        AppError::Internal(format!("PDF assembly failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
