//! Data models for the FieldSign API

use chrono::{DateTime, Utc};
use fieldsign_core::{CaptureMode, SignatureField};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ApiError;

/// Document lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    PendingSetup,
    Sent,
    Signed,
}

impl DocumentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DocumentStatus::Draft),
            "pending_setup" => Some(DocumentStatus::PendingSetup),
            "sent" => Some(DocumentStatus::Sent),
            "signed" => Some(DocumentStatus::Signed),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Draft => write!(f, "draft"),
            DocumentStatus::PendingSetup => write!(f, "pending_setup"),
            DocumentStatus::Sent => write!(f, "sent"),
            DocumentStatus::Signed => write!(f, "signed"),
        }
    }
}

/// Document record stored in the database
#[derive(Debug, Clone, FromRow)]
pub struct DbDocument {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    pub signed_file_path: Option<String>,
    pub sender_id: String,
    pub recipient_email: Option<String>,
    pub status: String,
    pub signature_areas_json: String,
    pub public_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
}

impl DbDocument {
    pub fn status(&self) -> Result<DocumentStatus, ApiError> {
        DocumentStatus::parse(&self.status)
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("unknown status {}", self.status)))
    }

    pub fn signature_areas(&self) -> Result<Vec<SignatureField>, ApiError> {
        serde_json::from_str(&self.signature_areas_json)
            .map_err(|e| ApiError::Internal(e.into()))
    }

    pub fn into_response(self) -> Result<DocumentResponse, ApiError> {
        let status = self.status()?;
        let signature_areas = self.signature_areas()?;
        Ok(DocumentResponse {
            id: self.id,
            filename: self.filename,
            file_path: self.file_path,
            signed_file_path: self.signed_file_path,
            sender_id: self.sender_id,
            recipient_email: self.recipient_email,
            status,
            signature_areas,
            public_link: self.public_link,
            created_at: self.created_at,
            signed_at: self.signed_at,
        })
    }
}

/// Document representation returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub filename: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_file_path: Option<String>,
    pub sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
    pub status: DocumentStatus,
    pub signature_areas: Vec<SignatureField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_link: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
}

/// Request to upload a new document
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub filename: String,
    pub pdf_base64: String,
}

/// Request to configure recipient and fields and send for signing
#[derive(Debug, Clone, Deserialize)]
pub struct SendRequest {
    pub recipient_email: String,
    pub signature_areas: Vec<SignatureField>,
}

/// Request body of the public signing submission
#[derive(Debug, Clone, Deserialize)]
pub struct SignRequest {
    pub mode: CaptureMode,
    /// PNG/JPEG raster for drawn and uploaded signatures
    #[serde(default)]
    pub signature_base64: Option<String>,
    /// Text for typed signatures, rendered server-side in the script face
    #[serde(default)]
    pub signature_text: Option<String>,
}

/// Response carrying a time-limited download URL
#[derive(Debug, Clone, Serialize)]
pub struct DownloadResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::PendingSetup,
            DocumentStatus::Sent,
            DocumentStatus::Signed,
        ] {
            assert_eq!(DocumentStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(DocumentStatus::parse("bogus"), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&DocumentStatus::PendingSetup).unwrap();
        assert_eq!(json, "\"pending_setup\"");
    }

    #[test]
    fn test_signature_areas_record_layout() {
        let json = r#"[{"id":3,"page":1,"x":0.1,"y":0.2,"width":0.15,"height":0.05}]"#;
        let fields: Vec<SignatureField> = serde_json::from_str(json).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].id, 3);
        assert_eq!(fields[0].page, 1);
        assert_eq!(fields[0].width, 0.15);
    }
}
