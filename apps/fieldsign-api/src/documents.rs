//! Document lifecycle: upload, configure, sign, delete
//!
//! Transitions follow pending_setup/draft -> sent -> signed. Each
//! persistence step is a single guarded statement so an invalid transition
//! or a concurrent change surfaces as one failure, and the status can never
//! advance without the artifact it depends on already being durable.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use fieldsign_core::{compose_signed_document, sanitize_filename, SignatureAsset, SignatureField};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{DbDocument, DocumentResponse, DocumentStatus};
use crate::state::AppState;
use crate::storage::ObjectStorage;
use crate::token;

/// Download links stay valid this long
const DOWNLOAD_TTL: Duration = Duration::from_secs(600);

const STORAGE_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(50);

const SELECT_COLUMNS: &str = r#"
    SELECT id, filename, file_path, signed_file_path, sender_id, recipient_email,
           status, signature_areas_json, public_link, created_at, signed_at
    FROM documents
"#;

/// Bounded retry with exponential backoff for transient storage I/O
async fn with_retry<T, F, Fut>(label: &str, mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut delay = BACKOFF_BASE;
    for attempt in 1..=STORAGE_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < STORAGE_ATTEMPTS => {
                warn!(attempt, error = %e, "{} failed; retrying", label);
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                warn!(error = %e, "{} failed after {} attempts", label, STORAGE_ATTEMPTS);
                return Err(ApiError::Storage(e));
            }
        }
    }
    Err(ApiError::Storage(anyhow::anyhow!("{} retries exhausted", label)))
}

/// Store a new original artifact and create its record (status pending_setup)
pub async fn upload_document(
    state: &AppState,
    sender_id: &str,
    filename: &str,
    pdf_bytes: Vec<u8>,
) -> Result<DocumentResponse, ApiError> {
    // Reject non-PDF payloads before touching storage
    fieldsign_core::get_page_count(&pdf_bytes)
        .map_err(|e| ApiError::InvalidRequest(format!("not a valid PDF: {}", e)))?;

    let id = Uuid::new_v4().to_string();
    let safe_name = sanitize_filename(filename);
    let path = format!("pdfs/{}_{}", id, safe_name);

    let stored_path = with_retry("upload original artifact", || {
        state.storage.put(&path, pdf_bytes.clone())
    })
    .await?;

    let now = Utc::now();
    let inserted = sqlx::query(
        r#"
        INSERT INTO documents (id, filename, file_path, sender_id, status, signature_areas_json, created_at)
        VALUES (?, ?, ?, ?, 'pending_setup', '[]', ?)
        "#,
    )
    .bind(&id)
    .bind(filename)
    .bind(&stored_path)
    .bind(sender_id)
    .bind(now.to_rfc3339())
    .execute(&state.db)
    .await;

    if let Err(e) = inserted {
        // Do not leave an orphan artifact behind a failed insert
        if let Err(cleanup) = state.storage.delete(&[stored_path.clone()]).await {
            warn!(error = %cleanup, path = %stored_path, "failed to clean up artifact after insert failure");
        }
        return Err(ApiError::Database(e));
    }

    info!(document_id = %id, sender_id, "uploaded document");
    fetch_owned(state, &id, sender_id).await?.into_response()
}

/// List the owner's documents, newest first
pub async fn list_documents(
    state: &AppState,
    sender_id: &str,
) -> Result<Vec<DocumentResponse>, ApiError> {
    let rows: Vec<DbDocument> = sqlx::query_as(&format!(
        "{} WHERE sender_id = ? ORDER BY created_at DESC",
        SELECT_COLUMNS
    ))
    .bind(sender_id)
    .fetch_all(&state.db)
    .await?;

    rows.into_iter().map(DbDocument::into_response).collect()
}

pub async fn get_document(
    state: &AppState,
    sender_id: &str,
    id: &str,
) -> Result<DocumentResponse, ApiError> {
    fetch_owned(state, id, sender_id).await?.into_response()
}

/// Configure recipient and fields, generate the public link, flip to sent.
///
/// Validation happens before any write; recipient, fields, link and status
/// are persisted together in one guarded statement.
pub async fn send_document(
    state: &AppState,
    sender_id: &str,
    id: &str,
    recipient_email: &str,
    signature_areas: Vec<SignatureField>,
) -> Result<DocumentResponse, ApiError> {
    if !token::is_valid_email(recipient_email) {
        return Err(ApiError::Validation(
            "a valid recipient email is required".to_string(),
        ));
    }
    if signature_areas.is_empty() {
        return Err(ApiError::Validation(
            "at least one signature field is required".to_string(),
        ));
    }

    let signature_areas: Vec<SignatureField> = signature_areas
        .into_iter()
        .map(|mut field| {
            field.set_rect(field.rect());
            field
        })
        .collect();
    let areas_json =
        serde_json::to_string(&signature_areas).map_err(|e| ApiError::Internal(e.into()))?;

    let public_link = token::generate();
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET recipient_email = ?, signature_areas_json = ?, public_link = ?, status = 'sent'
        WHERE id = ? AND sender_id = ? AND status IN ('draft', 'pending_setup')
        "#,
    )
    .bind(recipient_email)
    .bind(&areas_json)
    .bind(&public_link)
    .bind(id)
    .bind(sender_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        let doc = fetch_owned(state, id, sender_id).await?;
        return Err(ApiError::InvalidTransition(format!(
            "document cannot be sent from status {}",
            doc.status
        )));
    }

    info!(document_id = %id, "document sent for signature");
    fetch_owned(state, id, sender_id).await?.into_response()
}

/// Resolve a public sign link to its document.
/// The token format is checked before any store lookup.
pub async fn fetch_by_token(state: &AppState, link: &str) -> Result<DbDocument, ApiError> {
    if !token::is_valid(link) {
        return Err(ApiError::NotFound);
    }
    let doc: Option<DbDocument> =
        sqlx::query_as(&format!("{} WHERE public_link = ?", SELECT_COLUMNS))
            .bind(link)
            .fetch_optional(&state.db)
            .await?;
    doc.ok_or(ApiError::NotFound)
}

/// Fetch the original artifact bytes for the signing view
pub async fn signing_document_bytes(
    state: &AppState,
    link: &str,
) -> Result<(DbDocument, Vec<u8>), ApiError> {
    let doc = fetch_by_token(state, link).await?;
    let bytes = with_retry("download original artifact", || {
        state.storage.get(&doc.file_path)
    })
    .await?;
    Ok((doc, bytes))
}

/// Composite the signature into every field and flip the document to signed.
///
/// The signed artifact is uploaded before the status flips, so the record
/// never claims "signed" without durable bytes. Any compositing failure
/// aborts with nothing persisted.
pub async fn sign_document(
    state: &AppState,
    link: &str,
    asset: &SignatureAsset,
) -> Result<DocumentResponse, ApiError> {
    let doc = fetch_by_token(state, link).await?;
    match doc.status()? {
        DocumentStatus::Sent => {}
        DocumentStatus::Signed => {
            return Err(ApiError::InvalidTransition(
                "document has already been signed".to_string(),
            ))
        }
        other => {
            return Err(ApiError::InvalidTransition(format!(
                "document cannot be signed from status {}",
                other
            )))
        }
    }

    let fields = doc.signature_areas()?;
    let original = with_retry("download original artifact", || {
        state.storage.get(&doc.file_path)
    })
    .await?;

    let signed_bytes = compose_signed_document(&original, asset, &fields)?;

    let signed_path = format!(
        "signed/{}_{}",
        doc.id,
        sanitize_filename(&format!("signed_{}", doc.filename))
    );
    let stored_path = with_retry("upload signed artifact", || {
        state.storage.put(&signed_path, signed_bytes.clone())
    })
    .await?;

    let signed_at = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET status = 'signed', signed_file_path = ?, signed_at = ?
        WHERE id = ? AND status = 'sent'
        "#,
    )
    .bind(&stored_path)
    .bind(signed_at.to_rfc3339())
    .bind(&doc.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::InvalidTransition(
            "document is no longer out for signature".to_string(),
        ));
    }

    info!(document_id = %doc.id, "document signed");
    let signed: Option<DbDocument> = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
        .bind(&doc.id)
        .fetch_optional(&state.db)
        .await?;
    signed.ok_or(ApiError::NotFound)?.into_response()
}

/// Produce a time-limited download URL, preferring the signed artifact
pub async fn download_url(
    state: &AppState,
    sender_id: &str,
    id: &str,
) -> Result<String, ApiError> {
    let doc = fetch_owned(state, id, sender_id).await?;
    let path = doc.signed_file_path.as_deref().unwrap_or(&doc.file_path);
    with_retry("sign download url", || {
        state.storage.signed_url(path, DOWNLOAD_TTL)
    })
    .await
}

/// Delete a document: artifacts first, then the record.
///
/// Authorization to touch the stored objects is derived from the record, so
/// the record must outlive the bytes. If artifact removal fails the record
/// is left untouched and the caller can retry; if the record removal fails
/// after the bytes are gone, that inconsistency gets its own error.
pub async fn delete_document(
    state: &AppState,
    sender_id: &str,
    id: &str,
) -> Result<(), ApiError> {
    let doc = fetch_owned(state, id, sender_id).await?;

    let mut paths = vec![doc.file_path.clone()];
    if let Some(signed) = &doc.signed_file_path {
        paths.push(signed.clone());
    }

    with_retry("delete artifacts", || state.storage.delete(&paths)).await?;

    delete_record(state, sender_id, id).await?;
    info!(document_id = %id, "document deleted");
    Ok(())
}

/// Remove the metadata record after its artifacts are gone. A failure here
/// is reported as the distinguishable partial-deletion inconsistency, never
/// as success.
async fn delete_record(state: &AppState, sender_id: &str, id: &str) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM documents WHERE id = ? AND sender_id = ?")
        .bind(id)
        .bind(sender_id)
        .execute(&state.db)
        .await
        .map_err(|e| {
            warn!(document_id = %id, error = %e, "record deletion failed after artifact removal");
            ApiError::PartialDeletion {
                document_id: id.to_string(),
            }
        })?;
    Ok(())
}

async fn fetch_owned(
    state: &AppState,
    id: &str,
    sender_id: &str,
) -> Result<DbDocument, ApiError> {
    let doc: Option<DbDocument> = sqlx::query_as(&format!(
        "{} WHERE id = ? AND sender_id = ?",
        SELECT_COLUMNS
    ))
    .bind(id)
    .bind(sender_id)
    .fetch_optional(&state.db)
    .await?;
    doc.ok_or(ApiError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use fieldsign_core::CaptureMode;
    use std::io::Cursor;
    use std::sync::Arc;

    const OWNER: &str = "user-1";

    async fn test_state() -> (AppState, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let state = AppState::for_tests(storage.clone()).await.unwrap();
        (state, storage)
    }

    fn sample_pdf() -> Vec<u8> {
        use lopdf::{dictionary, Document, Object};

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => 1,
                "Kids" => vec![Object::Reference(page_id)],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn png_asset() -> SignatureAsset {
        let img = image::RgbaImage::from_pixel(6, 3, image::Rgba([0, 0, 0, 255]));
        let mut cursor = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        SignatureAsset {
            bytes: cursor.into_inner(),
            mode: CaptureMode::Drawn,
        }
    }

    fn one_field() -> Vec<SignatureField> {
        vec![SignatureField {
            id: 0,
            page: 0,
            x: 0.1,
            y: 0.1,
            width: 0.15,
            height: 0.05,
        }]
    }

    #[tokio::test]
    async fn test_upload_creates_pending_setup_record() {
        let (state, storage) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();

        assert_eq!(doc.status, DocumentStatus::PendingSetup);
        assert_eq!(doc.filename, "lease.pdf");
        assert!(doc.public_link.is_none());
        assert!(storage.contains(&doc.file_path));
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (state, storage) = test_state().await;
        let err = upload_document(&state, OWNER, "junk.pdf", b"hello".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_retries_transient_put_failure() {
        let (state, storage) = test_state().await;
        storage.fail_next_puts(1);
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();
        assert!(storage.contains(&doc.file_path));
    }

    #[tokio::test]
    async fn test_upload_fails_after_retries_exhausted() {
        let (state, storage) = test_state().await;
        storage.fail_next_puts(STORAGE_ATTEMPTS);
        let err = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));
        assert!(list_documents(&state, OWNER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_gates_on_recipient_and_fields() {
        let (state, _) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();

        // Empty recipient and no fields: rejected before any write
        let err = send_document(&state, OWNER, &doc.id, "", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = send_document(&state, OWNER, &doc.id, "alice@example.com", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let unchanged = get_document(&state, OWNER, &doc.id).await.unwrap();
        assert_eq!(unchanged.status, DocumentStatus::PendingSetup);
        assert!(unchanged.public_link.is_none());

        // With a field and a valid address the transition goes through
        let sent = send_document(&state, OWNER, &doc.id, "alice@example.com", one_field())
            .await
            .unwrap();
        assert_eq!(sent.status, DocumentStatus::Sent);
        assert_eq!(sent.recipient_email.as_deref(), Some("alice@example.com"));
        let link = sent.public_link.unwrap();
        assert!(token::is_valid(&link));
    }

    #[tokio::test]
    async fn test_send_clamps_out_of_bounds_fields() {
        let (state, _) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();

        let fields = vec![SignatureField {
            id: 0,
            page: 0,
            x: 0.95,
            y: -0.2,
            width: 0.15,
            height: 0.05,
        }];
        let sent = send_document(&state, OWNER, &doc.id, "alice@example.com", fields)
            .await
            .unwrap();
        let stored = &sent.signature_areas[0];
        assert!(stored.rect().in_bounds());
    }

    #[tokio::test]
    async fn test_send_twice_is_rejected() {
        let (state, _) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();
        send_document(&state, OWNER, &doc.id, "alice@example.com", one_field())
            .await
            .unwrap();

        let err = send_document(&state, OWNER, &doc.id, "bob@example.com", one_field())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_sign_flow_flips_status_after_artifact_upload() {
        let (state, storage) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();
        let sent = send_document(&state, OWNER, &doc.id, "alice@example.com", one_field())
            .await
            .unwrap();
        let link = sent.public_link.unwrap();

        let signed = sign_document(&state, &link, &png_asset()).await.unwrap();
        assert_eq!(signed.status, DocumentStatus::Signed);
        assert!(signed.signed_at.is_some());

        let signed_path = signed.signed_file_path.unwrap();
        assert!(storage.contains(&signed_path));
        // Original artifact survives; the signed bytes are a new object
        assert!(storage.contains(&signed.file_path));

        let artifact = storage.get(&signed_path).await.unwrap();
        assert_eq!(fieldsign_core::get_page_count(&artifact).unwrap(), 1);
        assert_ne!(artifact, storage.get(&signed.file_path).await.unwrap());
    }

    #[tokio::test]
    async fn test_sign_twice_is_rejected() {
        let (state, _) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();
        let sent = send_document(&state, OWNER, &doc.id, "alice@example.com", one_field())
            .await
            .unwrap();
        let link = sent.public_link.unwrap();

        sign_document(&state, &link, &png_asset()).await.unwrap();
        let err = sign_document(&state, &link, &png_asset())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_sign_requires_sent_status() {
        let (state, _) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();
        let sent = send_document(&state, OWNER, &doc.id, "alice@example.com", one_field())
            .await
            .unwrap();
        let link = sent.public_link.unwrap();

        // Pull the document back out of the sent state behind the link's back
        sqlx::query("UPDATE documents SET status = 'pending_setup' WHERE id = ?")
            .bind(&doc.id)
            .execute(&state.db)
            .await
            .unwrap();

        let err = sign_document(&state, &link, &png_asset())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidTransition(_)));

        let unchanged = get_document(&state, OWNER, &doc.id).await.unwrap();
        assert_eq!(unchanged.status, DocumentStatus::PendingSetup);
        assert!(unchanged.signed_file_path.is_none());
    }

    #[tokio::test]
    async fn test_compositing_failure_leaves_status_unchanged() {
        let (state, storage) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();
        let sent = send_document(&state, OWNER, &doc.id, "alice@example.com", one_field())
            .await
            .unwrap();
        let link = sent.public_link.unwrap();

        let bad_asset = SignatureAsset {
            bytes: b"GIF89a definitely not supported".to_vec(),
            mode: CaptureMode::Uploaded,
        };
        let err = sign_document(&state, &link, &bad_asset).await.unwrap_err();
        assert!(matches!(err, ApiError::Compositing(_)));

        let unchanged = get_document(&state, OWNER, &doc.id).await.unwrap();
        assert_eq!(unchanged.status, DocumentStatus::Sent);
        assert!(unchanged.signed_file_path.is_none());
        // No partially-signed artifact was persisted
        assert_eq!(storage.object_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_or_malformed_links_are_not_found() {
        let (state, _) = test_state().await;
        assert!(matches!(
            fetch_by_token(&state, "not-a-token").await.unwrap_err(),
            ApiError::NotFound
        ));
        assert!(matches!(
            fetch_by_token(&state, &token::generate()).await.unwrap_err(),
            ApiError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_delete_storage_first_failure_keeps_record() {
        let (state, storage) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();

        // Every retry attempt fails, so the error surfaces to the caller
        storage.fail_next_deletes(STORAGE_ATTEMPTS);
        let err = delete_document(&state, OWNER, &doc.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Storage(_)));

        // Record and artifact are both still there, ready for a retry
        let kept = get_document(&state, OWNER, &doc.id).await.unwrap();
        assert_eq!(kept.status, DocumentStatus::PendingSetup);
        assert!(storage.contains(&kept.file_path));

        // The retry removes artifact and record together
        delete_document(&state, OWNER, &doc.id).await.unwrap();
        assert!(matches!(
            get_document(&state, OWNER, &doc.id).await.unwrap_err(),
            ApiError::NotFound
        ));
        assert_eq!(storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_signed_artifact_too() {
        let (state, storage) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();
        let sent = send_document(&state, OWNER, &doc.id, "alice@example.com", one_field())
            .await
            .unwrap();
        sign_document(&state, &sent.public_link.unwrap(), &png_asset())
            .await
            .unwrap();
        assert_eq!(storage.object_count(), 2);

        delete_document(&state, OWNER, &doc.id).await.unwrap();
        assert_eq!(storage.object_count(), 0);
    }

    #[tokio::test]
    async fn test_record_deletion_failure_is_distinguishable() {
        let (state, _) = test_state().await;
        // A dead pool makes the record deletion fail after artifact removal
        state.db.close().await;
        let err = delete_record(&state, OWNER, "doc-1").await.unwrap_err();
        assert!(matches!(err, ApiError::PartialDeletion { .. }));
    }

    #[tokio::test]
    async fn test_documents_are_owner_scoped() {
        let (state, _) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();

        assert!(matches!(
            get_document(&state, "someone-else", &doc.id)
                .await
                .unwrap_err(),
            ApiError::NotFound
        ));
        assert!(list_documents(&state, "someone-else")
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            delete_document(&state, "someone-else", &doc.id)
                .await
                .unwrap_err(),
            ApiError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let (state, _) = test_state().await;
        let first = upload_document(&state, OWNER, "a.pdf", sample_pdf())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = upload_document(&state, OWNER, "b.pdf", sample_pdf())
            .await
            .unwrap();

        let listed = list_documents(&state, OWNER).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_download_prefers_signed_artifact() {
        let (state, _) = test_state().await;
        let doc = upload_document(&state, OWNER, "lease.pdf", sample_pdf())
            .await
            .unwrap();

        let url = download_url(&state, OWNER, &doc.id).await.unwrap();
        assert!(url.contains(&doc.file_path));

        let sent = send_document(&state, OWNER, &doc.id, "alice@example.com", one_field())
            .await
            .unwrap();
        let signed = sign_document(&state, &sent.public_link.unwrap(), &png_asset())
            .await
            .unwrap();

        let url = download_url(&state, OWNER, &doc.id).await.unwrap();
        assert!(url.contains(signed.signed_file_path.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn test_signing_document_bytes_serves_original() {
        let (state, _) = test_state().await;
        let pdf = sample_pdf();
        let doc = upload_document(&state, OWNER, "lease.pdf", pdf.clone())
            .await
            .unwrap();
        let sent = send_document(&state, OWNER, &doc.id, "alice@example.com", one_field())
            .await
            .unwrap();

        let (record, bytes) = signing_document_bytes(&state, &sent.public_link.unwrap())
            .await
            .unwrap();
        assert_eq!(record.id, doc.id);
        assert_eq!(bytes, pdf);
    }
}
