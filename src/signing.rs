// ABOUTME: Public token-keyed signing flow — capability URL, capture, completion
// ABOUTME: Shared signature-write and document-assembly pipeline used by all flows

use axum::{
    extract::{Path, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::directory::InvoiceSnapshot;
use crate::document;
use crate::entities::cession;
use crate::error::{AppError, Result};
use crate::signature::{self, SignatureArtifact};
use crate::storage::SignatureWrite;
use crate::types::{SignResponse, SignaturePayload, SigningPageResponse};
use crate::workflow::SignerRole;
use crate::AppState;

/// Resolve a signing token. No session required: the token itself is the
/// capability. An unknown token is a plain 404, without revealing which
/// party's link was tried.
pub async fn signing_page(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<SigningPageResponse>> {
    let (record, role) = state.storage.find_by_token(&token).await?;
    let already_signed = match role {
        SignerRole::Client => record.client_signature_url.is_some(),
        SignerRole::Repairer => record.dealer_signature_url.is_some(),
    };

    Ok(Json(SigningPageResponse {
        role,
        recipient_name: record.recipient_name,
        recipient_company: record.recipient_company,
        invoice_number: record.invoice_number,
        amount: record.amount,
        due_date: record.due_date,
        status: record.status,
        already_signed,
    }))
}

/// Capture and persist the token holder's signature. Nothing is written
/// until this explicit save; abandoning the page has no side effects.
pub async fn submit_signature(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<SignaturePayload>,
) -> Result<Json<SignResponse>> {
    let (record, role) = state.storage.find_by_token(&token).await?;
    let write = apply_signature(&state, record.id, role, &payload).await?;

    let signature_url = match role {
        SignerRole::Client => write.record.client_signature_url.clone(),
        SignerRole::Repairer => write.record.dealer_signature_url.clone(),
    }
    .unwrap_or_default();

    Ok(Json(SignResponse {
        status: write.record.status.clone(),
        signature_url,
        signed_at: write.record.signed_at,
        document_url: write.record.document_url.clone(),
    }))
}

/// The one signature write path: capture, then persist.
///
/// Capture or upload failure returns before anything is written. Assembly
/// failure after completion is logged and left for the on-demand document
/// route to retry; the signatures themselves stay recorded.
pub(crate) async fn apply_signature(
    state: &AppState,
    id: Uuid,
    role: SignerRole,
    payload: &SignaturePayload,
) -> Result<SignatureWrite> {
    let artifact = capture_payload(payload, role)?;
    store_signature(state, id, &artifact).await
}

/// Upload a captured artifact, record it with a partial-column update, and
/// on completion assemble the document. Capture happens before this, so the
/// creation flow can validate its inline sub-flows before inserting anything.
pub(crate) async fn store_signature(
    state: &AppState,
    id: Uuid,
    artifact: &SignatureArtifact,
) -> Result<SignatureWrite> {
    let role = artifact.role;
    let path = format!("cessions/{}/signature-{}.jpg", id, role.as_str());
    let url = state
        .blobs
        .upload(&path, &artifact.bytes, artifact.content_type)
        .await?;

    let mut write = state.storage.update_signature(id, role, &url).await?;

    if write.finalized {
        match assemble_and_store(state, &write.record).await {
            Ok(document_url) => write.record.document_url = Some(document_url),
            Err(err) => {
                tracing::error!(cession = %id, "document assembly after completion failed: {}", err);
            }
        }
    }

    Ok(write)
}

pub(crate) fn capture_payload(payload: &SignaturePayload, role: SignerRole) -> Result<SignatureArtifact> {
    match (&payload.strokes, &payload.image_base64) {
        (Some(strokes), None) => signature::capture_from_strokes(strokes, role),
        (None, Some(encoded)) => {
            let mime = payload
                .content_type
                .as_deref()
                .ok_or_else(|| AppError::BadRequest("content_type is required for uploads".to_string()))?;
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|e| AppError::BadRequest(format!("invalid base64 image: {}", e)))?;
            signature::capture_from_upload(&bytes, mime, role)
        }
        _ => Err(AppError::BadRequest(
            "provide either strokes or image_base64".to_string(),
        )),
    }
}

/// Assemble the legal document from the fresh record and persist it,
/// replacing any previously stored artifact reference.
///
/// A recorded signature URL whose blob cannot be fetched or decoded aborts
/// assembly with `SignatureImageUnavailable`: the document must never be
/// produced missing a signature it believes it has.
pub(crate) async fn assemble_and_store(state: &AppState, record: &cession::Model) -> Result<String> {
    let client_sig = load_signature(state, record.client_signature_url.as_deref()).await?;
    let dealer_sig = load_signature(state, record.dealer_signature_url.as_deref()).await?;

    let company = state
        .directory
        .company_profile(record.created_by)
        .unwrap_or_default();
    let invoice = record
        .invoice_id
        .and_then(|id| state.directory.invoice(id))
        .unwrap_or_else(|| InvoiceSnapshot {
            number: record.invoice_number.clone(),
            total: record.invoice_amount,
            vehicle: None,
            insurer: None,
            accident_date: None,
        });

    let bytes = document::assemble(
        record,
        &company,
        &invoice,
        client_sig.as_ref(),
        dealer_sig.as_ref(),
    )?;

    // Content-addressed name: re-assembly after a field change yields a new
    // URL, while an unchanged document keeps its existing one.
    let digest = hex::encode(&Sha256::digest(&bytes)[..4]);
    let path = format!("cessions/{}/cession-{}.pdf", record.id, digest);
    let url = state.blobs.upload(&path, &bytes, "application/pdf").await?;

    if let Some(previous) = record.document_url.as_deref() {
        if previous != url {
            if let Err(err) = state.blobs.remove(previous).await {
                tracing::warn!(cession = %record.id, "stale document cleanup failed: {}", err);
            }
        }
    }

    state.storage.set_document_url(record.id, &url).await?;
    Ok(url)
}

async fn load_signature(
    state: &AppState,
    url: Option<&str>,
) -> Result<Option<document::SignatureImage>> {
    let Some(url) = url else {
        return Ok(None);
    };
    let bytes = state
        .blobs
        .download(url)
        .await
        .map_err(|_| AppError::SignatureImageUnavailable(url.to_string()))?;
    Ok(Some(document::signature_image_from_bytes(url, bytes)?))
}
