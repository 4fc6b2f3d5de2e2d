//! Plan definitions.
//!
//! The storefront sells a closed set of plans. Billing product identifiers are
//! resolved to a plan through the plan catalog; an identifier the catalog does
//! not know is an error rather than a silent default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::foundation::ValidationError;

/// Subscription plan.
///
/// Determines the storage entitlement granted while the subscription is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKey {
    Basic,
    Standard,
    Pro,
}

impl PlanKey {
    /// Returns the storage representation for this plan.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKey::Basic => "basic",
            PlanKey::Standard => "standard",
            PlanKey::Pro => "pro",
        }
    }

    /// Returns the display name for this plan.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanKey::Basic => "Basic",
            PlanKey::Standard => "Standard",
            PlanKey::Pro => "Pro",
        }
    }
}

impl fmt::Display for PlanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PlanKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(PlanKey::Basic),
            "standard" => Ok(PlanKey::Standard),
            "pro" => Ok(PlanKey::Pro),
            other => Err(ValidationError::invalid_format(
                "plan_key",
                format!("unknown plan '{}'", other),
            )),
        }
    }
}

/// Catalog entry mapping a billing product to a plan and its entitlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTier {
    /// Billing product identifier, e.g. `com.example.photos.pro.monthly`.
    pub product_id: String,

    pub plan_key: PlanKey,

    /// Storage entitlement in bytes.
    pub storage_quota: i64,
}

impl PlanTier {
    pub fn new(product_id: impl Into<String>, plan_key: PlanKey, storage_quota: i64) -> Self {
        Self {
            product_id: product_id.into(),
            plan_key,
            storage_quota,
        }
    }
}

/// The catalog has no plan for a billing product.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no plan is configured for product '{product_id}'")]
pub struct UnresolvedProduct {
    pub product_id: String,
}

impl UnresolvedProduct {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_key_parses_storage_values() {
        assert_eq!("basic".parse::<PlanKey>().unwrap(), PlanKey::Basic);
        assert_eq!("standard".parse::<PlanKey>().unwrap(), PlanKey::Standard);
        assert_eq!("pro".parse::<PlanKey>().unwrap(), PlanKey::Pro);
    }

    #[test]
    fn plan_key_rejects_unknown_values() {
        assert!("enterprise".parse::<PlanKey>().is_err());
        assert!("Pro".parse::<PlanKey>().is_err());
    }

    #[test]
    fn plan_key_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlanKey::Pro).unwrap(), "\"pro\"");
    }

    #[test]
    fn plan_key_displays_name() {
        assert_eq!(PlanKey::Standard.to_string(), "Standard");
    }

    #[test]
    fn unresolved_product_names_the_product() {
        let err = UnresolvedProduct::new("com.example.legacy");
        assert!(err.to_string().contains("com.example.legacy"));
    }
}
