use serde::{Deserialize, Serialize};

use fieldrep_core::{DomainError, DomainResult, Entity, Money, ProductId};

/// Merchandising subtype of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSubtype {
    /// Regular shelf article.
    Standard,
    /// Display unit (pre-filled floor or counter display).
    Display,
    /// Promotional pack (bundle, seasonal, bonus pack).
    Promotional,
}

impl Default for ProductSubtype {
    fn default() -> Self {
        Self::Standard
    }
}

/// Optional packaging attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packaging {
    /// Net weight per unit in grams.
    pub weight_grams: Option<u32>,
    /// Units per pallet.
    pub pallet_size: Option<u32>,
}

/// Catalog product (immutable reference data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    category: String,
    #[serde(default)]
    subtype: ProductSubtype,
    /// Price per unit in smallest currency unit. Zero means "price unknown".
    unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    packaging: Option<Packaging>,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        category: impl Into<String>,
        subtype: ProductSubtype,
        unit_price: Money,
    ) -> DomainResult<Self> {
        let name = name.into();
        let category = category.into();

        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if category.trim().is_empty() {
            return Err(DomainError::validation("product category cannot be empty"));
        }

        Ok(Self {
            id,
            name,
            category,
            subtype,
            unit_price,
            packaging: None,
        })
    }

    pub fn with_packaging(mut self, packaging: Packaging) -> Self {
        self.packaging = Some(packaging);
        self
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn subtype(&self) -> ProductSubtype {
        self.subtype
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn packaging(&self) -> Option<&Packaging> {
        self.packaging.as_ref()
    }

    /// Whether the product has a usable (non-zero) unit price.
    pub fn is_priced(&self) -> bool {
        !self.unit_price.is_zero()
    }

    /// Category comparison used for affinity: trimmed, ASCII case-insensitive.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.trim().eq_ignore_ascii_case(category.trim())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
