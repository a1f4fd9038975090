//! Candidate pool builder.
//!
//! Narrows the availability set (or, when that is empty, the catalog snapshot)
//! to products that may replace the removed ones. Pool order is the
//! tie-breaker for every later ranking step, so it is the source iteration
//! order with duplicates dropped at their first occurrence.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use fieldrep_catalog::{Product, ProductSubtype};
use fieldrep_core::ProductId;

use crate::line_item::{AvailabilitySet, RemovalSet};

/// Category and subtype of the primary removed product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityProfile {
    pub category: String,
    pub subtype: ProductSubtype,
}

impl AffinityProfile {
    /// Profile of the first removed line with a positive quantity.
    pub fn of(removed: &RemovalSet) -> Option<Self> {
        removed.primary().map(|item| Self {
            category: item.product.category().to_string(),
            subtype: item.product.subtype(),
        })
    }

    pub fn category_matches(&self, product: &Product) -> bool {
        product.in_category(&self.category)
    }

    pub fn subtype_matches(&self, product: &Product) -> bool {
        product.subtype() == self.subtype
    }
}

/// Where the pool's products came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSource {
    Availability,
    Catalog,
}

/// Eligible replacement products, in stable order.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePool {
    pub profile: AffinityProfile,
    pub source: PoolSource,
    pub products: Vec<Product>,
}

impl CandidatePool {
    /// Build the pool. Returns `None` when the removal set has no line with a
    /// positive quantity.
    ///
    /// Category affinity is a hard filter: a product from another department is
    /// never a valid replacement.
    pub fn build(
        removed: &RemovalSet,
        available: &AvailabilitySet,
        catalog: &[Product],
    ) -> Option<Self> {
        let profile = AffinityProfile::of(removed)?;

        let (source, candidates): (PoolSource, Box<dyn Iterator<Item = &Product> + '_>) =
            if available.is_empty() {
                (PoolSource::Catalog, Box::new(catalog.iter()))
            } else {
                (PoolSource::Availability, Box::new(available.products()))
            };

        let mut seen: HashSet<ProductId> = HashSet::new();
        let products = candidates
            .filter(|p| profile.category_matches(p))
            .filter(|p| seen.insert(p.id_typed()))
            .cloned()
            .collect();

        Some(Self {
            profile,
            source,
            products,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Products with a usable unit price, in pool order.
    pub fn priced(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.is_priced())
    }

    /// Ids of eligible products skipped because their price is unknown (zero).
    pub fn unpriced(&self) -> Vec<ProductId> {
        self.products
            .iter()
            .filter(|p| !p.is_priced())
            .map(Product::id_typed)
            .collect()
    }
}
