//! PlanCatalog port - Product to plan resolution.
//!
//! Reference data loaded once at startup; lookups are synchronous.

use crate::domain::subscription::{PlanTier, UnresolvedProduct};

pub trait PlanCatalog: Send + Sync {
    /// Resolve a billing product id to its plan.
    ///
    /// # Errors
    ///
    /// Returns `UnresolvedProduct` for products the catalog does not list.
    fn resolve(&self, product_id: &str) -> Result<PlanTier, UnresolvedProduct>;
}
