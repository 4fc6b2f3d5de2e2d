//! Test signing chain and payload builders.
//!
//! Generates a root, a marked intermediate and marked leaf certificates with
//! `rcgen`, and signs billing-shaped payloads with the leaf key.

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CustomExtension, DnType, IsCa, KeyPair,
};
use serde_json::{json, Value};

use super::TrustStore;

pub const BUNDLE_ID: &str = "com.example.photos";

/// 2026-01-01T00:00:00Z in Unix milliseconds.
pub const BASE_MILLIS: i64 = 1_767_225_600_000;

pub const DAY_MILLIS: i64 = 86_400_000;

const LEAF_MARKER: &[u64] = &[1, 2, 840, 113635, 100, 6, 11, 1];
const INTERMEDIATE_MARKER: &[u64] = &[1, 2, 840, 113635, 100, 6, 2, 1];

struct Issued {
    der: Vec<u8>,
    key_pem: String,
}

pub struct SigningChain {
    root: Issued,
    root_pem: String,
    intermediate: Issued,
    leaf: Issued,
    leaf_direct: Issued,
    unmarked_leaf: Issued,
}

fn params(common_name: &str, ca: bool, marker: Option<&[u64]>) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    if ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    }
    if let Some(oid) = marker {
        params
            .custom_extensions
            .push(CustomExtension::from_oid_content(oid, vec![0x05, 0x00]));
    }
    params
}

fn issue(params: CertificateParams, issuer: &Certificate, issuer_key: &KeyPair) -> (Certificate, KeyPair) {
    let key = KeyPair::generate().unwrap();
    let cert = params.signed_by(&key, issuer, issuer_key).unwrap();
    (cert, key)
}

fn issued(cert: &Certificate, key: &KeyPair) -> Issued {
    Issued {
        der: cert.der().to_vec(),
        key_pem: key.serialize_pem(),
    }
}

impl SigningChain {
    pub fn generate() -> Self {
        let root_key = KeyPair::generate().unwrap();
        let root = params("Test Billing Root CA", true, None)
            .self_signed(&root_key)
            .unwrap();

        let (intermediate, intermediate_key) = issue(
            params("Test Billing Intermediate", true, Some(INTERMEDIATE_MARKER)),
            &root,
            &root_key,
        );
        let (leaf, leaf_key) = issue(
            params("Test Billing Signer", false, Some(LEAF_MARKER)),
            &intermediate,
            &intermediate_key,
        );
        let (leaf_direct, leaf_direct_key) = issue(
            params("Test Billing Direct Signer", false, Some(LEAF_MARKER)),
            &root,
            &root_key,
        );
        let (unmarked_leaf, unmarked_leaf_key) = issue(
            params("Test Unmarked Signer", false, None),
            &intermediate,
            &intermediate_key,
        );

        Self {
            root_pem: root.pem(),
            root: issued(&root, &root_key),
            intermediate: issued(&intermediate, &intermediate_key),
            leaf: issued(&leaf, &leaf_key),
            leaf_direct: issued(&leaf_direct, &leaf_direct_key),
            unmarked_leaf: issued(&unmarked_leaf, &unmarked_leaf_key),
        }
    }

    /// One chain per test binary.
    pub fn shared() -> &'static SigningChain {
        static CHAIN: OnceLock<SigningChain> = OnceLock::new();
        CHAIN.get_or_init(SigningChain::generate)
    }

    pub fn trust_store(&self) -> TrustStore {
        TrustStore::from_der(vec![self.root_der()]).unwrap()
    }

    /// Signs `claims` with the leaf and a full three-certificate x5c chain.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_chain(
            claims,
            vec![self.leaf_der(), self.intermediate_der(), self.root_der()],
            self.leaf_key_pem(),
        )
    }

    pub fn sign_with_chain(&self, claims: &Value, x5c: Vec<Vec<u8>>, key_pem: &str) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.x5c = Some(x5c.iter().map(|der| STANDARD.encode(der)).collect());
        let key = EncodingKey::from_ec_pem(key_pem.as_bytes()).unwrap();
        jsonwebtoken::encode(&header, claims, &key).unwrap()
    }

    pub fn root_der(&self) -> Vec<u8> {
        self.root.der.clone()
    }

    pub fn root_pem(&self) -> &str {
        &self.root_pem
    }

    pub fn intermediate_der(&self) -> Vec<u8> {
        self.intermediate.der.clone()
    }

    pub fn leaf_der(&self) -> Vec<u8> {
        self.leaf.der.clone()
    }

    pub fn leaf_key_pem(&self) -> &str {
        &self.leaf.key_pem
    }

    pub fn leaf_direct_der(&self) -> Vec<u8> {
        self.leaf_direct.der.clone()
    }

    pub fn leaf_direct_key_pem(&self) -> &str {
        &self.leaf_direct.key_pem
    }

    pub fn unmarked_leaf_der(&self) -> Vec<u8> {
        self.unmarked_leaf.der.clone()
    }

    pub fn unmarked_leaf_key_pem(&self) -> &str {
        &self.unmarked_leaf.key_pem
    }
}

/// Outer notification claims for the sandbox deployment.
pub fn notification_claims(
    notification_type: &str,
    subtype: Option<&str>,
    signed_transaction_info: &str,
    signed_renewal_info: Option<&str>,
) -> Value {
    let mut claims = json!({
        "notificationType": notification_type,
        "notificationUUID": format!("{}-{}", notification_type.to_lowercase(), signed_transaction_info.len()),
        "version": "2.0",
        "signedDate": BASE_MILLIS,
        "data": {
            "bundleId": BUNDLE_ID,
            "environment": "Sandbox",
            "signedTransactionInfo": signed_transaction_info,
        }
    });
    if let Some(subtype) = subtype {
        claims["subtype"] = json!(subtype);
    }
    if let Some(renewal) = signed_renewal_info {
        claims["data"]["signedRenewalInfo"] = json!(renewal);
    }
    claims
}

/// Transaction claims purchased at `BASE_MILLIS` and expiring 30 days later.
pub fn transaction_claims(original_transaction_id: &str, product_id: &str) -> Value {
    json!({
        "originalTransactionId": original_transaction_id,
        "transactionId": format!("{}-1", original_transaction_id),
        "productId": product_id,
        "bundleId": BUNDLE_ID,
        "purchaseDate": BASE_MILLIS,
        "originalPurchaseDate": BASE_MILLIS,
        "expiresDate": BASE_MILLIS + 30 * DAY_MILLIS,
        "appAccountToken": "5b8e7c1a-0f4e-4c55-9c1b-3a1f2d7e9a10",
        "environment": "Sandbox",
        "signedDate": BASE_MILLIS,
    })
}
