//! Signed notification envelopes and payload models.
//!
//! Billing notifications arrive as a compact JWS whose payload nests two
//! further JWS tokens: the transaction and the renewal info. Nothing in this
//! module is trusted; `UnverifiedEnvelope` only gives the verifier something
//! structurally sound to check, and `IdentityFragments` only feeds the audit
//! trail.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::Header;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{NotificationId, OriginalTransactionId};

use super::WebhookError;

/// Outer notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Upstream type, e.g. `DID_RENEW`.
    pub notification_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    #[serde(rename = "notificationUUID")]
    pub notification_uuid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Unix milliseconds.
    pub signed_date: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub bundle_id: String,

    /// `Sandbox` or `Production`.
    pub environment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_transaction_info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_renewal_info: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_apple_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_version: Option<String>,
}

/// Decoded `signedTransactionInfo`.
///
/// Dates are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub original_transaction_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    pub product_id: String,

    pub bundle_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_purchase_date: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_date: Option<i64>,

    /// Subscriber reference set by the storefront at purchase time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_account_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_date: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_date: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<i32>,
}

/// Decoded `signedRenewalInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalInfo {
    pub original_transaction_id: String,

    /// `1` when auto-renew is on, `0` when off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renew_status: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_renew_product_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_date: Option<i64>,
}

impl RenewalInfo {
    pub fn auto_renew(&self) -> Option<bool> {
        self.auto_renew_status.map(|status| status == 1)
    }
}

/// A structurally valid compact JWS whose header has been parsed.
///
/// Parsing trusts nothing: the header is attacker-controlled until the
/// verifier has walked its certificate chain.
#[derive(Debug, Clone)]
pub struct UnverifiedEnvelope {
    token: String,
    header: Header,
}

impl UnverifiedEnvelope {
    /// Parses the JWS header of `token`.
    ///
    /// # Errors
    ///
    /// Returns `Decode` when the token is not a three-part compact JWS or its
    /// header is not valid base64url JSON.
    pub fn parse(token: &str) -> Result<Self, WebhookError> {
        let token = token.trim();
        if token.split('.').count() != 3 {
            return Err(WebhookError::Decode(
                "signed payload is not a compact JWS".to_string(),
            ));
        }

        let header = jsonwebtoken::decode_header(token)
            .map_err(|err| WebhookError::Decode(format!("malformed JWS header: {}", err)))?;

        Ok(Self {
            token: token.to_string(),
            header,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Best-effort identity peek for the audit trail.
    pub fn identity_fragments(&self) -> IdentityFragments {
        IdentityFragments::salvage(&self.token)
    }
}

/// Identifiers recovered from an unverified payload.
///
/// Only ever used to label audit records for payloads that could not be
/// processed. Processing itself reads verified fields only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityFragments {
    pub notification_id: Option<NotificationId>,
    pub notification_type: Option<String>,
    pub subtype: Option<String>,
    pub original_transaction_id: Option<OriginalTransactionId>,
}

impl IdentityFragments {
    /// Reads whatever identity it can from `raw` without checking signatures.
    pub fn salvage(raw: &str) -> Self {
        let Some(outer) = peek_claims(raw) else {
            return Self::default();
        };

        let original_transaction_id = outer
            .get("data")
            .and_then(|data| data.get("signedTransactionInfo"))
            .and_then(Value::as_str)
            .and_then(peek_claims)
            .and_then(|tx| text(&tx, "originalTransactionId"))
            .and_then(|id| OriginalTransactionId::new(id).ok());

        Self {
            notification_id: text(&outer, "notificationUUID")
                .and_then(|id| NotificationId::new(id).ok()),
            notification_type: text(&outer, "notificationType"),
            subtype: text(&outer, "subtype"),
            original_transaction_id,
        }
    }

    /// Returns true if an audit record can be attributed to something.
    pub fn has_identity(&self) -> bool {
        self.notification_id.is_some() || self.original_transaction_id.is_some()
    }
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn peek_claims(token: &str) -> Option<Value> {
    let payload = token.trim().split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}
