// ABOUTME: Collaborator contracts consumed by the cession workflow
// ABOUTME: Company-profile and invoice lookups plus fire-and-forget notification dispatch

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Cedant identity block data, fed into the assembled document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub address: String,
    pub siret: String,
    pub rcs: String,
    pub vat_number: String,
    pub logo_url: Option<String>,
}

/// Invoice data snapshotted at cession creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSnapshot {
    pub number: String,
    pub total: f64,
    pub vehicle: Option<String>,
    pub insurer: Option<String>,
    pub accident_date: Option<String>,
}

/// In-memory stand-in for the hosted backend's company and invoice tables.
/// The workflow only depends on these two lookups.
#[derive(Clone, Default)]
pub struct Directory {
    companies: Arc<RwLock<HashMap<Uuid, CompanyProfile>>>,
    invoices: Arc<RwLock<HashMap<Uuid, InvoiceSnapshot>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_company(&self, user_id: Uuid, profile: CompanyProfile) {
        if let Ok(mut companies) = self.companies.write() {
            companies.insert(user_id, profile);
        }
    }

    pub fn company_profile(&self, user_id: Uuid) -> Option<CompanyProfile> {
        self.companies
            .read()
            .ok()
            .and_then(|companies| companies.get(&user_id).cloned())
    }

    pub fn insert_invoice(&self, invoice_id: Uuid, snapshot: InvoiceSnapshot) {
        if let Ok(mut invoices) = self.invoices.write() {
            invoices.insert(invoice_id, snapshot);
        }
    }

    pub fn invoice(&self, invoice_id: Uuid) -> Option<InvoiceSnapshot> {
        self.invoices
            .read()
            .ok()
            .and_then(|invoices| invoices.get(&invoice_id).cloned())
    }
}

/// Email dispatch is fire-and-forget; workflow correctness never depends on it.
#[derive(Clone, Default)]
pub struct Notifier;

impl Notifier {
    pub fn new() -> Self {
        Self
    }

    pub fn send_signing_link(&self, recipient_email: &str, signing_url: &str) {
        tracing::info!(
            recipient = recipient_email,
            url = signing_url,
            "dispatching signing link"
        );
    }
}
