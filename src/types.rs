// ABOUTME: Type definitions for API requests and responses
// ABOUTME: Creation, listing, status, and signing payloads for the cession workflow

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::cession;
use crate::signature::Point;
use crate::workflow::{CessionStatus, SignerRole};

// Session (stand-in identity provider)
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
}

// Cession creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCessionRequest {
    pub client_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_email: String,
    pub recipient_company: Option<String>,
    pub recipient_address: String,
    pub recipient_siret: Option<String>,
    pub recipient_ape_code: Option<String>,
    pub recipient_rcs: Option<String>,
    pub recipient_website: Option<String>,
    /// When present, the invoice snapshot is taken from the invoice lookup;
    /// otherwise `invoice_number` and `invoice_amount` must be supplied.
    pub invoice_id: Option<Uuid>,
    pub invoice_number: Option<String>,
    pub invoice_amount: Option<f64>,
    pub amount: Option<f64>,
    pub due_date: String,
    /// Optional in-person capture sub-flows on the creation form.
    pub client_signature: Option<SignaturePayload>,
    pub repairer_signature: Option<SignaturePayload>,
}

/// Either a drawn stroke set or an uploaded image (base64), never both.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignaturePayload {
    pub strokes: Option<Vec<Vec<Point>>>,
    pub image_base64: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CessionResponse {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_email: String,
    pub recipient_company: Option<String>,
    pub recipient_address: String,
    pub invoice_id: Option<Uuid>,
    pub invoice_number: String,
    pub invoice_amount: f64,
    pub amount: f64,
    pub due_date: String,
    pub status: String,
    pub client_sign_token: String,
    pub repairer_sign_token: String,
    pub client_signature_url: Option<String>,
    pub dealer_signature_url: Option<String>,
    pub document_url: Option<String>,
    pub created_at: i64,
    pub signed_at: Option<i64>,
}

impl From<cession::Model> for CessionResponse {
    fn from(m: cession::Model) -> Self {
        CessionResponse {
            id: m.id,
            client_id: m.client_id,
            recipient_name: m.recipient_name,
            recipient_email: m.recipient_email,
            recipient_company: m.recipient_company,
            recipient_address: m.recipient_address,
            invoice_id: m.invoice_id,
            invoice_number: m.invoice_number,
            invoice_amount: m.invoice_amount,
            amount: m.amount,
            due_date: m.due_date,
            status: m.status,
            client_sign_token: m.client_sign_token,
            repairer_sign_token: m.repairer_sign_token,
            client_signature_url: m.client_signature_url,
            dealer_signature_url: m.dealer_signature_url,
            document_url: m.document_url,
            created_at: m.created_at,
            signed_at: m.signed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListCessionsResponse {
    pub cessions: Vec<CessionResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CessionStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub document_url: String,
}

// Public signing page: only what the anonymous party needs to review.
// Tokens and the other party's data stay out of the payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct SigningPageResponse {
    pub role: SignerRole,
    pub recipient_name: String,
    pub recipient_company: Option<String>,
    pub invoice_number: String,
    pub amount: f64,
    pub due_date: String,
    pub status: String,
    pub already_signed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignResponse {
    pub status: String,
    pub signature_url: String,
    pub signed_at: Option<i64>,
    pub document_url: Option<String>,
}
