//! In-memory plan catalog.

use std::collections::HashMap;

use crate::domain::subscription::{PlanTier, UnresolvedProduct};
use crate::ports::PlanCatalog;

/// Product id to plan lookup table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlanCatalog {
    tiers: HashMap<String, PlanTier>,
}

impl InMemoryPlanCatalog {
    /// Creates a catalog. A later entry for the same product replaces an earlier one.
    pub fn new(tiers: impl IntoIterator<Item = PlanTier>) -> Self {
        Self {
            tiers: tiers
                .into_iter()
                .map(|tier| (tier.product_id.clone(), tier))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl PlanCatalog for InMemoryPlanCatalog {
    fn resolve(&self, product_id: &str) -> Result<PlanTier, UnresolvedProduct> {
        self.tiers
            .get(product_id)
            .cloned()
            .ok_or_else(|| UnresolvedProduct::new(product_id))
    }
}
