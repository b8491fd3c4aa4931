// ABOUTME: Cession de créance entity — one row per assignment document
// ABOUTME: Holds recipient data, invoice snapshot, signing tokens, and workflow state

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub recipient_name: String,
    pub recipient_email: String,
    pub recipient_company: Option<String>,
    pub recipient_address: String,
    pub recipient_siret: Option<String>,
    pub recipient_ape_code: Option<String>,
    pub recipient_rcs: Option<String>,
    pub recipient_website: Option<String>,
    pub invoice_id: Option<Uuid>,
    pub invoice_number: String,
    /// Invoice total frozen at creation time; never tracks later invoice edits.
    pub invoice_amount: f64,
    /// Ceded amount, defaults to the invoice total when unspecified.
    pub amount: f64,
    pub due_date: String,
    pub status: String,
    pub client_sign_token: String,
    pub repairer_sign_token: String,
    pub client_signature_url: Option<String>,
    pub dealer_signature_url: Option<String>,
    pub document_url: Option<String>,
    pub created_by: Uuid,
    pub created_at: i64,
    pub signed_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
