// ABOUTME: Comprehensive tests for the cession repository
// ABOUTME: Token resolution, partial signature writes, completion, filtering, deletion

#[cfg(test)]
mod tests {
    use super::super::storage::*;
    use super::super::workflow::{CessionStatus, SignerRole};
    use sea_orm::{EntityTrait, PaginatorTrait};
    use tempfile::TempDir;
    use uuid::Uuid;

    use crate::entities::Cession;
    use crate::error::AppError;

    async fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let storage = Storage::new_with_url(&db_url).await.unwrap();
        (storage, temp_dir)
    }

    fn sample_cession(created_by: Uuid) -> NewCession {
        NewCession {
            client_id: None,
            recipient_name: "Jean Dupont".to_string(),
            recipient_email: "jean.dupont@example.fr".to_string(),
            recipient_company: Some("Assurances Réunies".to_string()),
            recipient_address: "12 rue de la Paix, 75002 Paris".to_string(),
            recipient_siret: None,
            recipient_ape_code: None,
            recipient_rcs: None,
            recipient_website: None,
            invoice_id: None,
            invoice_number: "INV-042".to_string(),
            invoice_amount: 450.0,
            amount: None,
            due_date: "2026-09-30".to_string(),
            created_by,
        }
    }

    #[tokio::test]
    async fn test_create_cession_mints_tokens_and_starts_pending() {
        let (storage, _temp_dir) = create_test_storage().await;

        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        assert_eq!(record.status, "pending");
        assert!(!record.client_sign_token.is_empty());
        assert!(!record.repairer_sign_token.is_empty());
        assert_ne!(record.client_sign_token, record.repairer_sign_token);
        assert!(record.client_signature_url.is_none());
        assert!(record.dealer_signature_url.is_none());
        assert!(record.document_url.is_none());
        assert!(record.signed_at.is_none());
        // Ceded amount defaults to the invoice snapshot
        assert_eq!(record.amount, 450.0);
        assert_eq!(record.invoice_amount, 450.0);
    }

    #[tokio::test]
    async fn test_explicit_amount_overrides_default() {
        let (storage, _temp_dir) = create_test_storage().await;

        let mut new = sample_cession(Uuid::new_v4());
        new.amount = Some(300.0);
        let record = storage.create_cession(new).await.unwrap();

        assert_eq!(record.amount, 300.0);
        assert_eq!(record.invoice_amount, 450.0);
    }

    #[tokio::test]
    async fn test_get_unknown_cession_is_not_found() {
        let (storage, _temp_dir) = create_test_storage().await;

        let err = storage.get_cession(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_token_resolution_identifies_role() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        let (found, role) = storage.find_by_token(&record.client_sign_token).await.unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(role, SignerRole::Client);

        let (found, role) = storage
            .find_by_token(&record.repairer_sign_token)
            .await
            .unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(role, SignerRole::Repairer);
    }

    #[tokio::test]
    async fn test_token_resolution_is_idempotent() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        let first = storage.find_by_token(&record.client_sign_token).await.unwrap();
        let second = storage.find_by_token(&record.client_sign_token).await.unwrap();
        assert_eq!(first.0.id, second.0.id);
        assert_eq!(first.1, second.1);
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let (storage, _temp_dir) = create_test_storage().await;
        storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        let err = storage.find_by_token("abc123").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_one_signature_does_not_complete() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        let write = storage
            .update_signature(record.id, SignerRole::Client, "/artifacts/c.jpg")
            .await
            .unwrap();

        assert!(!write.finalized);
        assert_eq!(write.record.status, "pending");
        assert_eq!(
            write.record.client_signature_url.as_deref(),
            Some("/artifacts/c.jpg")
        );
        assert!(write.record.dealer_signature_url.is_none());
        assert!(write.record.signed_at.is_none());
    }

    #[tokio::test]
    async fn test_both_signatures_complete_exactly_once() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        let first = storage
            .update_signature(record.id, SignerRole::Client, "/artifacts/c.jpg")
            .await
            .unwrap();
        let second = storage
            .update_signature(record.id, SignerRole::Repairer, "/artifacts/r.jpg")
            .await
            .unwrap();

        // Exactly one of the two writes wins the completion transition
        assert!(!first.finalized);
        assert!(second.finalized);
        assert_eq!(second.record.status, "signed");
        assert!(second.record.signed_at.is_some());
        assert!(second.record.client_signature_url.is_some());
        assert!(second.record.dealer_signature_url.is_some());
    }

    #[tokio::test]
    async fn test_signing_order_is_commutative() {
        let (storage, _temp_dir) = create_test_storage().await;

        let a = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();
        storage
            .update_signature(a.id, SignerRole::Client, "/artifacts/c.jpg")
            .await
            .unwrap();
        storage
            .update_signature(a.id, SignerRole::Repairer, "/artifacts/r.jpg")
            .await
            .unwrap();

        let b = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();
        storage
            .update_signature(b.id, SignerRole::Repairer, "/artifacts/r.jpg")
            .await
            .unwrap();
        storage
            .update_signature(b.id, SignerRole::Client, "/artifacts/c.jpg")
            .await
            .unwrap();

        let a = storage.get_cession(a.id).await.unwrap();
        let b = storage.get_cession(b.id).await.unwrap();
        assert_eq!(a.status, "signed");
        assert_eq!(b.status, "signed");
        assert_eq!(a.client_signature_url, b.client_signature_url);
        assert_eq!(a.dealer_signature_url, b.dealer_signature_url);
    }

    #[tokio::test]
    async fn test_re_signing_overwrites_without_new_record() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        storage
            .update_signature(record.id, SignerRole::Client, "/artifacts/c1.jpg")
            .await
            .unwrap();
        let write = storage
            .update_signature(record.id, SignerRole::Client, "/artifacts/c2.jpg")
            .await
            .unwrap();

        assert_eq!(
            write.record.client_signature_url.as_deref(),
            Some("/artifacts/c2.jpg")
        );
        assert!(write.record.dealer_signature_url.is_none());

        let count = Cession::find().count(&storage.db).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_completion_does_not_refire_after_signed() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        storage
            .update_signature(record.id, SignerRole::Client, "/artifacts/c.jpg")
            .await
            .unwrap();
        let completing = storage
            .update_signature(record.id, SignerRole::Repairer, "/artifacts/r.jpg")
            .await
            .unwrap();
        assert!(completing.finalized);
        let signed_at = completing.record.signed_at;

        // Tokens stay live; a repeat submission overwrites but never
        // re-finalizes or restamps signed_at.
        let repeat = storage
            .update_signature(record.id, SignerRole::Repairer, "/artifacts/r2.jpg")
            .await
            .unwrap();
        assert!(!repeat.finalized);
        assert_eq!(repeat.record.status, "signed");
        assert_eq!(repeat.record.signed_at, signed_at);
    }

    #[tokio::test]
    async fn test_signed_cannot_be_set_directly() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        let err = storage
            .update_status(record.id, CessionStatus::Signed)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let unchanged = storage.get_cession(record.id).await.unwrap();
        assert_eq!(unchanged.status, "pending");
    }

    #[tokio::test]
    async fn test_repairer_status_changes() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        let sent = storage
            .update_status(record.id, CessionStatus::Sent)
            .await
            .unwrap();
        assert_eq!(sent.status, "sent");

        let rejected = storage
            .update_status(record.id, CessionStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(rejected.status, "rejected");
    }

    #[tokio::test]
    async fn test_signing_refused_on_rejected_record() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();
        storage
            .update_status(record.id, CessionStatus::Rejected)
            .await
            .unwrap();

        let err = storage
            .update_signature(record.id, SignerRole::Client, "/artifacts/c.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let unchanged = storage.get_cession(record.id).await.unwrap();
        assert!(unchanged.client_signature_url.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_status_and_text() {
        let (storage, _temp_dir) = create_test_storage().await;
        let user = Uuid::new_v4();

        storage.create_cession(sample_cession(user)).await.unwrap();

        let mut other = sample_cession(user);
        other.recipient_name = "Marie Curie".to_string();
        other.invoice_number = "INV-100".to_string();
        let other = storage.create_cession(other).await.unwrap();
        storage
            .update_status(other.id, CessionStatus::Sent)
            .await
            .unwrap();

        // No filter: everything
        let all = storage
            .list_cessions(CessionFilter {
                status: None,
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        // Status filter
        let sent = storage
            .list_cessions(CessionFilter {
                status: Some(CessionStatus::Sent),
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_name, "Marie Curie");

        // Text filter matches recipient name or invoice number
        let by_name = storage
            .list_cessions(CessionFilter {
                status: None,
                search: Some("Dupont".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);

        let by_invoice = storage
            .list_cessions(CessionFilter {
                status: None,
                search: Some("INV-100".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_invoice.len(), 1);

        // Status AND text must both match
        let none = storage
            .list_cessions(CessionFilter {
                status: Some(CessionStatus::Sent),
                search: Some("Dupont".to_string()),
            })
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_set_document_url_replaces_previous() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        storage
            .set_document_url(record.id, "/artifacts/v1.pdf")
            .await
            .unwrap();
        storage
            .set_document_url(record.id, "/artifacts/v2.pdf")
            .await
            .unwrap();

        let fresh = storage.get_cession(record.id).await.unwrap();
        assert_eq!(fresh.document_url.as_deref(), Some("/artifacts/v2.pdf"));
    }

    #[tokio::test]
    async fn test_delete_is_hard() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        storage.delete_cession(record.id).await.unwrap();

        let err = storage.get_cession(record.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = storage.delete_cession(record.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_signed_invariant_holds_after_every_write() {
        let (storage, _temp_dir) = create_test_storage().await;
        let record = storage
            .create_cession(sample_cession(Uuid::new_v4()))
            .await
            .unwrap();

        storage
            .update_signature(record.id, SignerRole::Client, "/artifacts/c.jpg")
            .await
            .unwrap();
        storage
            .update_signature(record.id, SignerRole::Repairer, "/artifacts/r.jpg")
            .await
            .unwrap();

        for record in Cession::find().all(&storage.db).await.unwrap() {
            if record.status == "signed" {
                assert!(record.client_signature_url.is_some());
                assert!(record.dealer_signature_url.is_some());
            }
        }
    }
}
