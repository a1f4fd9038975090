use std::sync::Arc;

use thiserror::Error;

use fieldrep_core::ProductId;

use crate::product::Product;

/// Catalog access failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only accessor for the product catalog.
///
/// Implementations must return products in a stable order (e.g. catalog
/// insertion order): downstream ranking breaks ties on that order.
pub trait Catalog: Send + Sync {
    fn list_products(&self) -> Result<Vec<Product>, CatalogError>;
}

impl<C> Catalog for Arc<C>
where
    C: Catalog + ?Sized,
{
    fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        (**self).list_products()
    }
}

/// In-memory catalog snapshot for tests/dev and for callers that already
/// fetched the product list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: Vec<Product>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a product list, keeping its order.
    ///
    /// A later entry with an already-seen id replaces the earlier one in place.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = Self::new();
        for product in products {
            catalog.upsert(product);
        }
        catalog
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.upsert(product);
        self
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id_typed() == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn upsert(&mut self, product: Product) {
        match self
            .products
            .iter_mut()
            .find(|p| p.id_typed() == product.id_typed())
        {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }
}

impl Catalog for InMemoryCatalog {
    fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.clone())
    }
}
