//! Webhook error types for billing notification handling.
//!
//! Defines every way processing a notification can fail, with HTTP status
//! mapping and retryability semantics.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::OriginalTransactionId;

/// Why a signed payload could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// The JWS header declares an algorithm other than ES256.
    #[error("unsupported signing algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// The JWS header carries no usable x5c chain.
    #[error("missing certificate chain")]
    MissingCertificateChain,

    /// The x5c chain does not lead to a pinned root.
    #[error("untrusted certificate chain: {0}")]
    UntrustedChain(String),

    /// The leaf key does not verify the JWS signature.
    #[error("invalid signature")]
    InvalidSignature,

    #[error("bundle id mismatch: expected {expected}, got {actual}")]
    BundleMismatch { expected: String, actual: String },

    #[error("environment mismatch: expected {expected}, got {actual}")]
    EnvironmentMismatch { expected: String, actual: String },
}

impl AuthFailure {
    /// Returns true for failures that prove the payload is inauthentic.
    ///
    /// Bundle and environment mismatches are authentic payloads meant for a
    /// different deployment.
    pub fn is_inauthentic(&self) -> bool {
        !matches!(
            self,
            AuthFailure::BundleMismatch { .. } | AuthFailure::EnvironmentMismatch { .. }
        )
    }
}

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The payload or a nested payload failed authentication.
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthFailure),

    /// Malformed token, invalid base64 or JSON, or missing required fields.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The product is not in the plan catalog.
    #[error("Unresolvable event: {0}")]
    Unresolvable(String),

    /// The event references a subscription not yet recorded.
    #[error("Orphan event: no subscription for original transaction {0}")]
    Orphan(OriginalTransactionId),

    /// Storage failed or timed out.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl WebhookError {
    /// Returns true if the sender should redeliver this notification.
    ///
    /// An orphan may succeed once the missing `SUBSCRIBED` notification lands.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Orphan(_) | WebhookError::Persistence(_))
    }

    /// Maps the error to an appropriate HTTP status code.
    ///
    /// Status codes drive the sender's redelivery:
    /// - 2xx: acknowledged, no redelivery
    /// - 4xx: rejected, no redelivery
    /// - 5xx: redelivered
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Authentication(_) | WebhookError::Decode(_) => StatusCode::BAD_REQUEST,

            // Deliberately ignored products are acknowledged
            WebhookError::Unresolvable(_) => StatusCode::OK,

            WebhookError::Orphan(_) | WebhookError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns true if this failure gets an audit record.
    ///
    /// Inauthentic payloads are logged and dropped without a record.
    pub fn is_audited(&self) -> bool {
        match self {
            WebhookError::Authentication(failure) => !failure.is_inauthentic(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn otid() -> OriginalTransactionId {
        OriginalTransactionId::new("T2").unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Error Display Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn authentication_displays_failure() {
        let err = WebhookError::from(AuthFailure::InvalidSignature);
        assert_eq!(format!("{}", err), "Authentication failed: invalid signature");
    }

    #[test]
    fn bundle_mismatch_names_both_bundles() {
        let err = AuthFailure::BundleMismatch {
            expected: "com.example.photos".to_string(),
            actual: "com.other.app".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "bundle id mismatch: expected com.example.photos, got com.other.app"
        );
    }

    #[test]
    fn orphan_displays_transaction() {
        let err = WebhookError::Orphan(otid());
        assert_eq!(
            format!("{}", err),
            "Orphan event: no subscription for original transaction T2"
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Status Code Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn authentication_and_decode_are_bad_requests() {
        assert_eq!(
            WebhookError::from(AuthFailure::MissingCertificateChain).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::Decode("truncated".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unresolvable_is_acknowledged() {
        let err = WebhookError::Unresolvable("com.example.legacy".to_string());
        assert_eq!(err.status_code(), StatusCode::OK);
    }

    #[test]
    fn orphan_and_persistence_are_server_errors() {
        assert_eq!(
            WebhookError::Orphan(otid()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WebhookError::Persistence("timeout".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Retryability and Audit Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn only_orphan_and_persistence_are_retryable() {
        assert!(WebhookError::Orphan(otid()).is_retryable());
        assert!(WebhookError::Persistence("down".to_string()).is_retryable());
        assert!(!WebhookError::Decode("bad".to_string()).is_retryable());
        assert!(!WebhookError::Unresolvable("p".to_string()).is_retryable());
        assert!(!WebhookError::from(AuthFailure::InvalidSignature).is_retryable());
    }

    #[test]
    fn inauthentic_payloads_are_not_audited() {
        assert!(!WebhookError::from(AuthFailure::InvalidSignature).is_audited());
        assert!(!WebhookError::from(AuthFailure::UntrustedChain("x".into())).is_audited());
        assert!(!WebhookError::from(AuthFailure::UnsupportedAlgorithm("HS256".into())).is_audited());
        assert!(!WebhookError::from(AuthFailure::MissingCertificateChain).is_audited());
    }

    #[test]
    fn deployment_mismatches_are_audited() {
        let err = WebhookError::from(AuthFailure::EnvironmentMismatch {
            expected: "Production".to_string(),
            actual: "Sandbox".to_string(),
        });
        assert!(err.is_audited());
        assert!(WebhookError::Decode("bad".to_string()).is_audited());
        assert!(WebhookError::Orphan(otid()).is_audited());
    }
}
