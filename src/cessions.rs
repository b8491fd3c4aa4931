// ABOUTME: Authenticated cession endpoints — creation, listing, status, document, deletion
// ABOUTME: Field-level validation and invoice snapshotting happen at creation time

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::CookieJar;
use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, FieldError, Result};
use crate::session::extract_session_from_jar;
use crate::signing;
use crate::storage::{CessionFilter, NewCession};
use crate::types::{
    CessionResponse, CreateCessionRequest, DocumentResponse, ListCessionsResponse, ListQuery,
    UpdateStatusRequest,
};
use crate::workflow::{CessionStatus, SignerRole};
use crate::AppState;

pub async fn create_cession(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CreateCessionRequest>,
) -> Result<Json<CessionResponse>> {
    let session = extract_session_from_jar(&jar, &state.sessions)?;

    let mut fields = Vec::new();
    if req.recipient_name.trim().is_empty() {
        fields.push(FieldError {
            field: "recipient_name",
            message: "Le nom du destinataire est requis".to_string(),
        });
    }
    if !req.recipient_email.contains('@') {
        fields.push(FieldError {
            field: "recipient_email",
            message: "Adresse e-mail invalide".to_string(),
        });
    }
    if req.recipient_address.trim().is_empty() {
        fields.push(FieldError {
            field: "recipient_address",
            message: "L'adresse du destinataire est requise".to_string(),
        });
    }
    if NaiveDate::parse_from_str(&req.due_date, "%Y-%m-%d").is_err() {
        fields.push(FieldError {
            field: "due_date",
            message: "Date d'échéance invalide (AAAA-MM-JJ attendu)".to_string(),
        });
    }
    if let Some(amount) = req.amount {
        if amount <= 0.0 {
            fields.push(FieldError {
                field: "amount",
                message: "Le montant cédé doit être positif".to_string(),
            });
        }
    }

    // Snapshot the invoice now; the record must not track later invoice edits.
    let (invoice_number, invoice_amount) = match req.invoice_id {
        Some(invoice_id) => match state.directory.invoice(invoice_id) {
            Some(invoice) => (invoice.number, invoice.total),
            None => {
                fields.push(FieldError {
                    field: "invoice_id",
                    message: "Facture introuvable".to_string(),
                });
                (String::new(), 0.0)
            }
        },
        None => {
            let number = req.invoice_number.clone().unwrap_or_default();
            if number.trim().is_empty() {
                fields.push(FieldError {
                    field: "invoice_number",
                    message: "Le numéro de facture est requis".to_string(),
                });
            }
            let amount = req.invoice_amount.unwrap_or(0.0);
            if amount <= 0.0 {
                fields.push(FieldError {
                    field: "invoice_amount",
                    message: "Le montant de la facture doit être positif".to_string(),
                });
            }
            (number, amount)
        }
    };

    if !fields.is_empty() {
        return Err(AppError::Validation(fields));
    }

    // Capture the optional in-person sub-flows before inserting anything:
    // a capture failure must leave no record behind, so the form can retry
    // without creating duplicates.
    let client_artifact = match &req.client_signature {
        Some(payload) => Some(signing::capture_payload(payload, SignerRole::Client)?),
        None => None,
    };
    let repairer_artifact = match &req.repairer_signature {
        Some(payload) => Some(signing::capture_payload(payload, SignerRole::Repairer)?),
        None => None,
    };

    let mut record = state
        .storage
        .create_cession(NewCession {
            client_id: req.client_id,
            recipient_name: req.recipient_name,
            recipient_email: req.recipient_email,
            recipient_company: req.recipient_company,
            recipient_address: req.recipient_address,
            recipient_siret: req.recipient_siret,
            recipient_ape_code: req.recipient_ape_code,
            recipient_rcs: req.recipient_rcs,
            recipient_website: req.recipient_website,
            invoice_id: req.invoice_id,
            invoice_number,
            invoice_amount,
            amount: req.amount,
            due_date: req.due_date,
            created_by: session.user_id,
        })
        .await?;

    if let Some(artifact) = &client_artifact {
        record = signing::store_signature(&state, record.id, artifact).await?.record;
    }
    if let Some(artifact) = &repairer_artifact {
        record = signing::store_signature(&state, record.id, artifact).await?.record;
    }

    let signing_url = format!("/sign/{}", record.client_sign_token);
    state
        .notifier
        .send_signing_link(&record.recipient_email, &signing_url);

    Ok(Json(record.into()))
}

pub async fn list_cessions(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListCessionsResponse>> {
    extract_session_from_jar(&jar, &state.sessions)?;

    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(s) => Some(
            CessionStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown status filter: {}", s)))?,
        ),
    };

    let cessions = state
        .storage
        .list_cessions(CessionFilter {
            status,
            search: query.q,
        })
        .await?;

    Ok(Json(ListCessionsResponse {
        cessions: cessions.into_iter().map(CessionResponse::from).collect(),
    }))
}

pub async fn get_cession(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Json<CessionResponse>> {
    extract_session_from_jar(&jar, &state.sessions)?;
    let record = state.storage.get_cession(id).await?;
    Ok(Json(record.into()))
}

pub async fn update_status(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<CessionResponse>> {
    extract_session_from_jar(&jar, &state.sessions)?;
    let record = state.storage.update_status(id, req.status).await?;
    Ok(Json(record.into()))
}

/// Return the stored document address, assembling on demand when the
/// record has none yet (or a previous assembly attempt failed).
pub async fn get_document(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>> {
    extract_session_from_jar(&jar, &state.sessions)?;
    let record = state.storage.get_cession(id).await?;

    if let Some(url) = record.document_url.clone() {
        return Ok(Json(DocumentResponse { document_url: url }));
    }

    let document_url = signing::assemble_and_store(&state, &record).await?;
    Ok(Json(DocumentResponse { document_url }))
}

pub async fn delete_cession(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    extract_session_from_jar(&jar, &state.sessions)?;
    state.storage.delete_cession(id).await?;
    Ok(Json(json!({"success": true})))
}
