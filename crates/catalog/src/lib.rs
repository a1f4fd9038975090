//! Product catalog (read-only reference data).
//!
//! The catalog is owned by an external data store. This crate models the
//! products the exchange engine reasons about and the accessor boundary the
//! engine reads them through.

pub mod catalog;
pub mod product;

pub use catalog::{Catalog, CatalogError, InMemoryCatalog};
pub use product::{Packaging, Product, ProductSubtype};
