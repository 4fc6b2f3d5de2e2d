//! Signed payload verification.
//!
//! Every billing JWS carries its signing certificate chain in the `x5c`
//! header. A payload is authentic only if that chain ends in a pinned root,
//! each link is signed by the next, the certificates carry the billing
//! signer markers, and the leaf key verifies the JWS itself.
//!
//! Verification is pure: the only key material is the trust store loaded at
//! startup.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use x509_parser::certificate::X509Certificate;
use x509_parser::pem::Pem;

use super::envelope::{NotificationData, NotificationPayload, RenewalInfo, TransactionInfo};
use super::{AuthFailure, UnverifiedEnvelope, WebhookError};

/// Extension marking a certificate as a billing payload signer.
const LEAF_MARKER_OID: &str = "1.2.840.113635.100.6.11.1";

/// Extension marking the intermediate that issues signer certificates.
const INTERMEDIATE_MARKER_OID: &str = "1.2.840.113635.100.6.2.1";

/// Billing environment a deployment accepts notifications from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    /// The tag used inside signed payloads.
    pub fn payload_tag(&self) -> &'static str {
        match self {
            Environment::Sandbox => "Sandbox",
            Environment::Production => "Production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payload_tag())
    }
}

/// Errors loading pinned root certificates.
#[derive(Debug, Error)]
pub enum TrustStoreError {
    #[error("failed to read root certificate {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid root certificate {path}: {reason}")]
    InvalidCertificate { path: PathBuf, reason: String },

    #[error("no root certificates configured")]
    Empty,
}

/// Pinned root certificates, held as DER.
#[derive(Debug, Clone)]
pub struct TrustStore {
    roots: Vec<Vec<u8>>,
}

impl TrustStore {
    /// Builds a store from DER certificates.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or a certificate does not parse.
    pub fn from_der(roots: Vec<Vec<u8>>) -> Result<Self, TrustStoreError> {
        if roots.is_empty() {
            return Err(TrustStoreError::Empty);
        }
        for (index, der) in roots.iter().enumerate() {
            x509_parser::parse_x509_certificate(der).map_err(|err| {
                TrustStoreError::InvalidCertificate {
                    path: PathBuf::from(format!("<root #{}>", index)),
                    reason: err.to_string(),
                }
            })?;
        }
        Ok(Self { roots })
    }

    /// Loads roots from PEM or DER files. A PEM file may hold several
    /// certificates.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, TrustStoreError> {
        let mut roots = Vec::new();

        for path in paths {
            let path = path.as_ref();
            let bytes = fs::read(path).map_err(|source| TrustStoreError::Io {
                path: path.to_path_buf(),
                source,
            })?;

            let invalid = |reason: String| TrustStoreError::InvalidCertificate {
                path: path.to_path_buf(),
                reason,
            };

            if bytes.starts_with(b"-----BEGIN") {
                for pem in Pem::iter_from_buffer(&bytes) {
                    let pem = pem.map_err(|err| invalid(err.to_string()))?;
                    pem.parse_x509().map_err(|err| invalid(err.to_string()))?;
                    roots.push(pem.contents);
                }
            } else {
                x509_parser::parse_x509_certificate(&bytes)
                    .map_err(|err| invalid(err.to_string()))?;
                roots.push(bytes);
            }
        }

        if roots.is_empty() {
            return Err(TrustStoreError::Empty);
        }
        Ok(Self { roots })
    }

    /// Returns true if `der` is byte-identical to a pinned root.
    pub fn contains(&self, der: &[u8]) -> bool {
        self.roots.iter().any(|root| root.as_slice() == der)
    }

    /// Hex SHA-256 fingerprints of the pinned roots.
    pub fn fingerprints(&self) -> Vec<String> {
        self.roots
            .iter()
            .map(|root| {
                Sha256::digest(root)
                    .iter()
                    .map(|byte| format!("{:02x}", byte))
                    .collect::<String>()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// A notification whose signature, chain, bundle and environment checked out.
///
/// Only `SignedPayloadVerifier::verify_notification` constructs one.
#[derive(Debug, Clone)]
pub struct VerifiedNotification {
    notification_type: String,
    subtype: Option<String>,
    notification_uuid: String,
    signed_date: i64,
    data: NotificationData,
}

impl VerifiedNotification {
    pub fn notification_type(&self) -> &str {
        &self.notification_type
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn notification_uuid(&self) -> &str {
        &self.notification_uuid
    }

    /// Unix milliseconds.
    pub fn signed_date(&self) -> i64 {
        self.signed_date
    }

    /// Still-signed nested transaction info.
    pub fn signed_transaction_info(&self) -> Option<&str> {
        self.data.signed_transaction_info.as_deref()
    }

    /// Still-signed nested renewal info.
    pub fn signed_renewal_info(&self) -> Option<&str> {
        self.data.signed_renewal_info.as_deref()
    }

    pub fn bundle_id(&self) -> &str {
        &self.data.bundle_id
    }
}

/// Verifies billing JWS payloads against pinned roots.
pub struct SignedPayloadVerifier {
    trust: TrustStore,
    bundle_id: String,
    environment: Environment,
}

impl SignedPayloadVerifier {
    pub fn new(trust: TrustStore, bundle_id: impl Into<String>, environment: Environment) -> Self {
        Self {
            trust,
            bundle_id: bundle_id.into(),
            environment,
        }
    }

    /// Verify the outer notification.
    ///
    /// # Errors
    ///
    /// - `Authentication` for algorithm, chain, signature, bundle or
    ///   environment failures
    /// - `Decode` for malformed payloads
    pub fn verify_notification(
        &self,
        envelope: &UnverifiedEnvelope,
    ) -> Result<VerifiedNotification, WebhookError> {
        let payload: NotificationPayload = self.verify_jws(envelope)?;

        let data = payload
            .data
            .ok_or_else(|| WebhookError::Decode("notification has no data section".to_string()))?;

        self.check_bundle(&data.bundle_id)?;
        self.check_environment(&data.environment)?;

        Ok(VerifiedNotification {
            notification_type: payload.notification_type,
            subtype: payload.subtype,
            notification_uuid: payload.notification_uuid,
            signed_date: payload.signed_date,
            data,
        })
    }

    /// Verify a nested `signedTransactionInfo`.
    pub fn verify_transaction(&self, token: &str) -> Result<TransactionInfo, WebhookError> {
        let envelope = UnverifiedEnvelope::parse(token)?;
        let transaction: TransactionInfo = self.verify_jws(&envelope)?;

        self.check_bundle(&transaction.bundle_id)?;
        if let Some(environment) = &transaction.environment {
            self.check_environment(environment)?;
        }
        Ok(transaction)
    }

    /// Verify a nested `signedRenewalInfo`.
    pub fn verify_renewal(&self, token: &str) -> Result<RenewalInfo, WebhookError> {
        let envelope = UnverifiedEnvelope::parse(token)?;
        self.verify_jws(&envelope)
    }

    fn verify_jws<T: DeserializeOwned>(
        &self,
        envelope: &UnverifiedEnvelope,
    ) -> Result<T, WebhookError> {
        let leaf_key = self.verify_chain(envelope.header())?;

        let mut validation = Validation::new(Algorithm::ES256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let token = jsonwebtoken::decode::<T>(
            envelope.token(),
            &DecodingKey::from_ec_der(&leaf_key),
            &validation,
        )
        .map_err(|err| match err.kind() {
            ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::Base64(_) | ErrorKind::InvalidToken => {
                WebhookError::Decode(format!("malformed signed payload: {}", err))
            }
            _ => WebhookError::Authentication(AuthFailure::InvalidSignature),
        })?;

        Ok(token.claims)
    }

    /// Walks the x5c chain and returns the leaf's public key point.
    fn verify_chain(&self, header: &Header) -> Result<Vec<u8>, AuthFailure> {
        if header.alg != Algorithm::ES256 {
            return Err(AuthFailure::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let chain = header
            .x5c
            .as_ref()
            .filter(|chain| chain.len() >= 2)
            .ok_or(AuthFailure::MissingCertificateChain)?;

        let ders = chain
            .iter()
            .map(|entry| STANDARD.decode(entry))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| AuthFailure::UntrustedChain(format!("x5c entry is not base64: {}", err)))?;

        let root = ders.last().ok_or(AuthFailure::MissingCertificateChain)?;
        if !self.trust.contains(root) {
            return Err(AuthFailure::UntrustedChain(
                "chain does not end in a pinned root".to_string(),
            ));
        }

        let certs = ders
            .iter()
            .map(|der| x509_parser::parse_x509_certificate(der).map(|(_, cert)| cert))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| AuthFailure::UntrustedChain(format!("unparseable certificate: {}", err)))?;

        for (position, cert) in certs.iter().enumerate() {
            if !cert.validity().is_valid() {
                return Err(AuthFailure::UntrustedChain(format!(
                    "certificate {} is outside its validity window",
                    position
                )));
            }

            let Some(issuer) = certs.get(position + 1) else {
                continue;
            };
            if !issuer.is_ca() {
                return Err(AuthFailure::UntrustedChain(format!(
                    "certificate {} is not a CA",
                    position + 1
                )));
            }
            cert.verify_signature(Some(issuer.public_key())).map_err(|err| {
                AuthFailure::UntrustedChain(format!(
                    "certificate {} is not signed by its issuer: {}",
                    position, err
                ))
            })?;
        }

        let leaf = &certs[0];
        if !has_extension(leaf, LEAF_MARKER_OID) {
            return Err(AuthFailure::UntrustedChain(
                "leaf is not a billing payload signer".to_string(),
            ));
        }
        if certs.len() > 2 && !has_extension(&certs[1], INTERMEDIATE_MARKER_OID) {
            return Err(AuthFailure::UntrustedChain(
                "intermediate is not a billing signer issuer".to_string(),
            ));
        }

        let point: &[u8] = &leaf.public_key().subject_public_key.data;
        Ok(point.to_vec())
    }

    fn check_bundle(&self, actual: &str) -> Result<(), AuthFailure> {
        if actual != self.bundle_id {
            return Err(AuthFailure::BundleMismatch {
                expected: self.bundle_id.clone(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }

    fn check_environment(&self, actual: &str) -> Result<(), AuthFailure> {
        if actual != self.environment.payload_tag() {
            return Err(AuthFailure::EnvironmentMismatch {
                expected: self.environment.payload_tag().to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(())
    }
}

fn has_extension(cert: &X509Certificate<'_>, oid: &str) -> bool {
    cert.extensions()
        .iter()
        .any(|extension| extension.oid.to_id_string() == oid)
}
