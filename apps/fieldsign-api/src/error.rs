//! Error types for the FieldSign API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fieldsign_core::FieldsignError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Document not found")]
    NotFound,

    #[error("Missing or invalid owner identity")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("Storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("Artifacts removed but record remains for document {document_id}")]
    PartialDeletion { document_id: String },

    #[error("Compositing failed: {0}")]
    Compositing(#[from] FieldsignError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "Document not found".to_string(),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing or invalid owner identity".to_string(),
            ),
            ApiError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation", msg.clone()),
            ApiError::InvalidTransition(msg) => {
                (StatusCode::CONFLICT, "invalid_transition", msg.clone())
            }
            ApiError::Storage(e) => {
                tracing::error!("Storage error: {:#}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "storage",
                    "Storage unavailable".to_string(),
                )
            }
            ApiError::PartialDeletion { document_id } => {
                tracing::error!(
                    document_id = %document_id,
                    "artifacts removed but metadata record remains; manual follow-up required"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "files_removed_record_remains",
                    format!(
                        "Stored files for document {} were removed but the record \
                         could not be deleted; retry the deletion",
                        document_id
                    ),
                )
            }
            ApiError::Compositing(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "compositing",
                e.to_string(),
            ),
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database",
                    "Database error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
