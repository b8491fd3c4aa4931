// ABOUTME: SQLite repository for cession records via SeaORM
// ABOUTME: Partial-column signature writes and a conditional, exactly-once completion transition

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, Database, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use crate::entities::{cession, Cession};
use crate::error::{AppError, Result};
use crate::migration::Migrator;
use crate::workflow::{self, mint_token, CessionStatus, SignerRole};

pub struct Storage {
    pub db: DatabaseConnection,
}

/// Creation payload; the invoice amount is a snapshot taken by the caller
/// at creation time.
#[derive(Debug, Clone)]
pub struct NewCession {
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
    pub invoice_amount: f64,
    /// Ceded amount; defaults to the invoice total when unspecified.
    pub amount: Option<f64>,
    pub due_date: String,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct CessionFilter {
    pub status: Option<CessionStatus>,
    pub search: Option<String>,
}

/// Result of a signature write: the fresh record and whether this write won
/// the completion transition.
#[derive(Debug)]
pub struct SignatureWrite {
    pub record: cession::Model,
    pub finalized: bool,
}

impl Storage {
    pub async fn new() -> Result<Self> {
        Self::new_with_url("sqlite:cessionflow.db?mode=rwc").await
    }

    pub async fn new_with_url(url: &str) -> Result<Self> {
        let db = Database::connect(url).await?;
        Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    pub async fn create_cession(&self, new: NewCession) -> Result<cession::Model> {
        let amount = new.amount.unwrap_or(new.invoice_amount);
        let model = cession::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(new.client_id),
            recipient_name: Set(new.recipient_name),
            recipient_email: Set(new.recipient_email),
            recipient_company: Set(new.recipient_company),
            recipient_address: Set(new.recipient_address),
            recipient_siret: Set(new.recipient_siret),
            recipient_ape_code: Set(new.recipient_ape_code),
            recipient_rcs: Set(new.recipient_rcs),
            recipient_website: Set(new.recipient_website),
            invoice_id: Set(new.invoice_id),
            invoice_number: Set(new.invoice_number),
            invoice_amount: Set(new.invoice_amount),
            amount: Set(amount),
            due_date: Set(new.due_date),
            status: Set(CessionStatus::Pending.as_str().to_string()),
            client_sign_token: Set(mint_token()),
            repairer_sign_token: Set(mint_token()),
            client_signature_url: Set(None),
            dealer_signature_url: Set(None),
            document_url: Set(None),
            created_by: Set(new.created_by),
            created_at: Set(chrono::Utc::now().timestamp()),
            signed_at: Set(None),
        };

        Ok(model.insert(&self.db).await?)
    }

    pub async fn get_cession(&self, id: Uuid) -> Result<cession::Model> {
        Cession::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cession {}", id)))
    }

    pub async fn list_cessions(&self, filter: CessionFilter) -> Result<Vec<cession::Model>> {
        let mut condition = Condition::all();
        if let Some(status) = filter.status {
            condition = condition.add(cession::Column::Status.eq(status.as_str()));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                condition = condition.add(
                    Condition::any()
                        .add(cession::Column::RecipientName.contains(search))
                        .add(cession::Column::InvoiceNumber.contains(search)),
                );
            }
        }

        Ok(Cession::find()
            .filter(condition)
            .order_by_desc(cession::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Capability-URL resolution: match the token against either token
    /// column. Exactly one role can match; a miss never reveals which
    /// column was tried.
    pub async fn find_by_token(&self, token: &str) -> Result<(cession::Model, SignerRole)> {
        if let Some(record) = Cession::find()
            .filter(cession::Column::ClientSignToken.eq(token))
            .one(&self.db)
            .await?
        {
            return Ok((record, SignerRole::Client));
        }

        if let Some(record) = Cession::find()
            .filter(cession::Column::RepairerSignToken.eq(token))
            .one(&self.db)
            .await?
        {
            return Ok((record, SignerRole::Repairer));
        }

        Err(AppError::NotFound("signing token".to_string()))
    }

    /// Repairer-initiated status change. `signed` can never be set this way;
    /// the completion transition is the only path into it.
    pub async fn update_status(&self, id: Uuid, to: CessionStatus) -> Result<cession::Model> {
        let current = self.get_cession(id).await?;
        let from = parse_status(&current.status)?;
        if !workflow::status_change_allowed(from, to) {
            return Err(AppError::BadRequest(
                "Status 'signed' is reached only when both parties have signed".to_string(),
            ));
        }

        let active = cession::ActiveModel {
            id: Set(id),
            status: Set(to.as_str().to_string()),
            ..Default::default()
        };
        Ok(active.update(&self.db).await?)
    }

    /// Record one party's signature URL, then re-evaluate the completion
    /// rule against fresh state.
    ///
    /// The write touches only the caller's column (never the other party's),
    /// and completion is a conditional update filtered on both URLs being
    /// present and the status not yet being `signed`. Two parties signing
    /// within milliseconds of each other thus finalize exactly once.
    pub async fn update_signature(
        &self,
        id: Uuid,
        role: SignerRole,
        url: &str,
    ) -> Result<SignatureWrite> {
        let current = self.get_cession(id).await?;
        let status = parse_status(&current.status)?;
        if !workflow::signing_allowed(status) {
            return Err(AppError::BadRequest(
                "Document cannot be signed in its current status".to_string(),
            ));
        }

        let mut active = cession::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        match role {
            SignerRole::Client => active.client_signature_url = Set(Some(url.to_string())),
            SignerRole::Repairer => active.dealer_signature_url = Set(Some(url.to_string())),
        }
        active.update(&self.db).await?;

        let finalized = self.try_finalize(id).await?;
        let record = self.get_cession(id).await?;
        Ok(SignatureWrite { record, finalized })
    }

    /// Conditional completion transition: set `signed` and stamp `signed_at`
    /// iff both signatures exist and the record is still circulating.
    /// Returns whether this call performed the transition.
    async fn try_finalize(&self, id: Uuid) -> Result<bool> {
        let result = Cession::update_many()
            .col_expr(
                cession::Column::Status,
                Expr::value(CessionStatus::Signed.as_str()),
            )
            .col_expr(
                cession::Column::SignedAt,
                Expr::value(chrono::Utc::now().timestamp()),
            )
            .filter(cession::Column::Id.eq(id))
            .filter(cession::Column::ClientSignatureUrl.is_not_null())
            .filter(cession::Column::DealerSignatureUrl.is_not_null())
            .filter(cession::Column::Status.is_in([
                CessionStatus::Pending.as_str(),
                CessionStatus::Sent.as_str(),
            ]))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Record the assembled document's address, replacing any prior one.
    pub async fn set_document_url(&self, id: Uuid, url: &str) -> Result<()> {
        let active = cession::ActiveModel {
            id: Set(id),
            document_url: Set(Some(url.to_string())),
            ..Default::default()
        };
        active.update(&self.db).await?;
        Ok(())
    }

    /// Hard delete, no tombstone.
    pub async fn delete_cession(&self, id: Uuid) -> Result<()> {
        let result = Cession::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("cession {}", id)));
        }
        Ok(())
    }
}

fn parse_status(s: &str) -> Result<CessionStatus> {
    CessionStatus::parse(s)
        .ok_or_else(|| AppError::Internal(format!("corrupt status value: {}", s)))
}
