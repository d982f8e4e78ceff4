//! HTTP handlers for the FieldSign API

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use fieldsign_core::{CaptureMode, ScriptFace, SignatureAsset, SignatureCapture};

use crate::documents;
use crate::error::ApiError;
use crate::models::{
    DocumentResponse, DownloadResponse, SendRequest, SignRequest, UploadRequest,
};
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// The owner identity comes from the identity provider in front of this
/// service; the API only reads the resolved user id
fn owner_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthorized)
}

/// Upload a new document PDF
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UploadRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let bytes = BASE64
        .decode(&req.pdf_base64)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid PDF base64: {}", e)))?;
    documents::upload_document(&state, &owner, &req.filename, bytes)
        .await
        .map(Json)
}

/// List the caller's documents
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let owner = owner_id(&headers)?;
    documents::list_documents(&state, &owner).await.map(Json)
}

/// Fetch one document
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    documents::get_document(&state, &owner, &id).await.map(Json)
}

/// Configure recipient and signature fields and generate the public link
pub async fn send_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<SendRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    documents::send_document(&state, &owner, &id, &req.recipient_email, req.signature_areas)
        .await
        .map(Json)
}

/// Delete a document and its stored artifacts
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let owner = owner_id(&headers)?;
    documents::delete_document(&state, &owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Produce a time-limited download URL for the (signed) artifact
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let owner = owner_id(&headers)?;
    let url = documents::download_url(&state, &owner, &id).await?;
    Ok(Json(DownloadResponse { url }))
}

/// Public signing flow: resolve a link token to its document
pub async fn get_sign_context(
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
) -> Result<Json<DocumentResponse>, ApiError> {
    documents::fetch_by_token(&state, &link)
        .await?
        .into_response()
        .map(Json)
}

/// Public signing flow: original document bytes for rendering
pub async fn get_sign_document_bytes(
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
) -> Result<(StatusCode, [(String, String); 2], Vec<u8>), ApiError> {
    let (doc, bytes) = documents::signing_document_bytes(&state, &link).await?;
    Ok((
        StatusCode::OK,
        [
            ("Content-Type".to_string(), "application/pdf".to_string()),
            (
                "Content-Disposition".to_string(),
                format!("inline; filename=\"{}\"", doc.filename),
            ),
        ],
        bytes,
    ))
}

/// Public signing flow: submit the captured signature
pub async fn submit_signature(
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
    Json(req): Json<SignRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let asset = resolve_asset(&state, &req)?;
    documents::sign_document(&state, &link, &asset)
        .await
        .map(Json)
}

/// Normalize the submitted capture into the single signature asset.
/// Missing input is rejected here, before any store access.
fn resolve_asset(state: &AppState, req: &SignRequest) -> Result<SignatureAsset, ApiError> {
    match req.mode {
        CaptureMode::Typed => {
            let text = req.signature_text.as_deref().unwrap_or_default();
            if text.trim().is_empty() {
                return Err(ApiError::Validation(
                    "signature text is required for typed signatures".to_string(),
                ));
            }
            let face_bytes = state.script_face.clone().ok_or_else(|| {
                ApiError::Validation("typed signatures are not available".to_string())
            })?;
            let face = ScriptFace::from_bytes(face_bytes).map_err(|_| {
                ApiError::Internal(anyhow::anyhow!("configured signature font is invalid"))
            })?;

            let mut capture = SignatureCapture::new().with_script_face(face);
            capture.set_mode(CaptureMode::Typed);
            capture.set_text(text);
            Ok(capture.finalize()?)
        }
        CaptureMode::Drawn | CaptureMode::Uploaded => {
            let encoded = req
                .signature_base64
                .as_deref()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    ApiError::Validation("a signature image is required".to_string())
                })?;
            let bytes = BASE64
                .decode(encoded)
                .map_err(|e| ApiError::InvalidRequest(format!("Invalid signature base64: {}", e)))?;
            Ok(SignatureAsset {
                bytes,
                mode: req.mode,
            })
        }
    }
}
