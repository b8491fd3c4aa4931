// ABOUTME: Cession document state machine, signer roles, and signing token minting
// ABOUTME: Pure transition and completion rules enforced by the storage layer

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

const TOKEN_BYTES: usize = 32; // 256 bits, unguessable capability token

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CessionStatus {
    Draft,
    Pending,
    Sent,
    Signed,
    Rejected,
}

impl CessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CessionStatus::Draft => "draft",
            CessionStatus::Pending => "pending",
            CessionStatus::Sent => "sent",
            CessionStatus::Signed => "signed",
            CessionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(CessionStatus::Draft),
            "pending" => Some(CessionStatus::Pending),
            "sent" => Some(CessionStatus::Sent),
            "signed" => Some(CessionStatus::Signed),
            "rejected" => Some(CessionStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CessionStatus::Signed | CessionStatus::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignerRole {
    Client,
    Repairer,
}

impl SignerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignerRole::Client => "client",
            SignerRole::Repairer => "repairer",
        }
    }
}

/// Mint an opaque, single-purpose signing token (base64url, no padding).
pub fn mint_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Whether the repairer may move a record from `from` to `to`.
///
/// `signed` is never settable directly; only the completion rule reaches it.
/// Terminal records still accept status changes for record-keeping.
pub fn status_change_allowed(_from: CessionStatus, to: CessionStatus) -> bool {
    to != CessionStatus::Signed
}

/// Whether a token-holding party may write its signature field in `status`.
///
/// Signing is only meaningful while the document circulates. A completed
/// document stays reachable (tokens are not invalidated) and a repeated
/// submission overwrites the same field; draft and rejected records refuse
/// signature writes.
pub fn signing_allowed(status: CessionStatus) -> bool {
    matches!(
        status,
        CessionStatus::Pending | CessionStatus::Sent | CessionStatus::Signed
    )
}

/// Completion rule: a record becomes `signed` exactly when both signature
/// URLs are present and it has not already been finalized. Evaluated against
/// a freshly read record after every signature write.
pub fn completion_due(
    client_signature_url: Option<&str>,
    dealer_signature_url: Option<&str>,
    status: CessionStatus,
) -> bool {
    client_signature_url.is_some()
        && dealer_signature_url.is_some()
        && matches!(status, CessionStatus::Pending | CessionStatus::Sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_tokens_are_opaque_and_distinct() {
        let a = mint_token();
        let b = mint_token();
        assert_eq!(a.len(), 43); // 32 bytes base64url without padding
        assert_ne!(a, b);
        assert!(!a.contains('='));
        assert!(!a.contains('/'));
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            CessionStatus::Draft,
            CessionStatus::Pending,
            CessionStatus::Sent,
            CessionStatus::Signed,
            CessionStatus::Rejected,
        ] {
            assert_eq!(CessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CessionStatus::parse("unknown"), None);
    }

    #[test]
    fn test_signed_is_never_set_directly() {
        for from in [
            CessionStatus::Draft,
            CessionStatus::Pending,
            CessionStatus::Sent,
            CessionStatus::Signed,
            CessionStatus::Rejected,
        ] {
            assert!(!status_change_allowed(from, CessionStatus::Signed));
        }
    }

    #[test]
    fn test_repairer_status_changes() {
        assert!(status_change_allowed(
            CessionStatus::Pending,
            CessionStatus::Sent
        ));
        assert!(status_change_allowed(
            CessionStatus::Sent,
            CessionStatus::Rejected
        ));
        assert!(status_change_allowed(
            CessionStatus::Draft,
            CessionStatus::Pending
        ));
        // Record-keeping changes remain possible on terminal records
        assert!(status_change_allowed(
            CessionStatus::Signed,
            CessionStatus::Rejected
        ));
    }

    #[test]
    fn test_signing_allowed_states() {
        assert!(signing_allowed(CessionStatus::Pending));
        assert!(signing_allowed(CessionStatus::Sent));
        assert!(signing_allowed(CessionStatus::Signed)); // idempotent overwrite
        assert!(!signing_allowed(CessionStatus::Draft));
        assert!(!signing_allowed(CessionStatus::Rejected));
    }

    #[test]
    fn test_completion_requires_both_signatures() {
        assert!(!completion_due(None, None, CessionStatus::Pending));
        assert!(!completion_due(Some("a.jpg"), None, CessionStatus::Pending));
        assert!(!completion_due(None, Some("b.jpg"), CessionStatus::Sent));
        assert!(completion_due(
            Some("a.jpg"),
            Some("b.jpg"),
            CessionStatus::Pending
        ));
        assert!(completion_due(
            Some("a.jpg"),
            Some("b.jpg"),
            CessionStatus::Sent
        ));
    }

    #[test]
    fn test_completion_fires_only_once() {
        // Once signed, the rule no longer fires, so a second signature write
        // cannot re-trigger assembly.
        assert!(!completion_due(
            Some("a.jpg"),
            Some("b.jpg"),
            CessionStatus::Signed
        ));
    }

    #[test]
    fn test_completion_is_commutative() {
        // Either party may complete the pair; the rule only looks at the
        // combined state, not at who wrote last.
        let after_client_then_repairer =
            completion_due(Some("c.jpg"), Some("d.jpg"), CessionStatus::Pending);
        let after_repairer_then_client =
            completion_due(Some("c.jpg"), Some("d.jpg"), CessionStatus::Pending);
        assert_eq!(after_client_then_repairer, after_repairer_then_client);
    }
}
