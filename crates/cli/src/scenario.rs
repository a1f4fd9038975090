//! Scenario file: catalog snapshot, removals, optional availability and
//! optional inline policy.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use fieldrep_catalog::{InMemoryCatalog, Product};
use fieldrep_core::ProductId;
use fieldrep_exchange::{
    AvailabilitySet, BundleEngine, LineItem, Recommendation, RecommendationRequest, RemovalSet,
    TargetPolicy,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub catalog: Vec<Product>,
    pub removed: Vec<ScenarioLine>,
    #[serde(default)]
    pub available: Vec<ScenarioLine>,
    #[serde(default)]
    pub policy: Option<TargetPolicy>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Run the engine. `fallback` is used when the scenario has no inline policy.
    pub fn recommend(&self, fallback: impl FnOnce() -> Result<TargetPolicy>) -> Result<Recommendation> {
        let policy = match &self.policy {
            Some(policy) => policy.clone(),
            None => fallback()?,
        };
        let engine = BundleEngine::new(policy).context("invalid target policy")?;

        let catalog = InMemoryCatalog::from_products(self.catalog.iter().cloned());
        let removed = RemovalSet::from_items(resolve(&catalog, &self.removed, "removed")?);
        let available = AvailabilitySet::from_items(resolve(&catalog, &self.available, "available")?);
        let products: Vec<Product> = self.catalog.clone();

        Ok(engine.recommend(RecommendationRequest {
            removed: &removed,
            available: &available,
            catalog: &products,
        })?)
    }
}

fn resolve(catalog: &InMemoryCatalog, lines: &[ScenarioLine], list: &str) -> Result<Vec<LineItem>> {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(product) = catalog.get(line.product_id) else {
            bail!("{list} line references unknown product {}", line.product_id);
        };
        items.push(LineItem::new(product.clone(), line.quantity));
    }
    Ok(items)
}
