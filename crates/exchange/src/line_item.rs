use serde::{Deserialize, Serialize};

use fieldrep_catalog::Product;
use fieldrep_core::{Money, ProductId, ValueObject};

/// A product with a quantity (a removed shelf position or a bundle component).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: Product,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product: Product, quantity: u32) -> Self {
        Self { product, quantity }
    }

    pub fn product_id(&self) -> ProductId {
        self.product.id_typed()
    }

    /// `unit_price × quantity`.
    pub fn value(&self) -> Money {
        self.product.unit_price().times(self.quantity)
    }
}

impl ValueObject for LineItem {}

/// Ordered line items keyed by product: adding a product that is already
/// present increases its quantity instead of adding a second line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItems(Vec<LineItem>);

impl LineItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        let mut set = Self::new();
        for item in items {
            set.add(item);
        }
        set
    }

    pub fn add(&mut self, item: LineItem) {
        match self
            .0
            .iter_mut()
            .find(|existing| existing.product_id() == item.product_id())
        {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            }
            None => self.0.push(item),
        }
    }

    /// Replace the quantity of an existing line. Returns `false` if the product
    /// is not present.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        match self.0.iter_mut().find(|i| i.product_id() == product_id) {
            Some(existing) => {
                existing.quantity = quantity;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, product_id: ProductId) -> Option<LineItem> {
        let idx = self.0.iter().position(|i| i.product_id() == product_id)?;
        Some(self.0.remove(idx))
    }

    pub fn items(&self) -> &[LineItem] {
        &self.0
    }

    pub fn into_items(self) -> Vec<LineItem> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Σ unit_price × quantity`.
    pub fn total_value(&self) -> Money {
        self.0.iter().map(LineItem::value).sum()
    }

    /// Lines with a positive quantity, in order.
    pub fn positive(&self) -> impl Iterator<Item = &LineItem> {
        self.0.iter().filter(|i| i.quantity > 0)
    }
}

/// Products taken off a shelf. Their value drives the replacement target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemovalSet(LineItems);

impl RemovalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        Self(LineItems::from_items(items))
    }

    pub fn add(&mut self, item: LineItem) {
        self.0.add(item);
    }

    pub fn remove(&mut self, product_id: ProductId) -> Option<LineItem> {
        self.0.remove(product_id)
    }

    pub fn items(&self) -> &[LineItem] {
        self.0.items()
    }

    /// `removedValue = Σ price × quantity`.
    pub fn removed_value(&self) -> Money {
        self.0.total_value()
    }

    /// At least one line with a positive quantity (required to calculate).
    pub fn is_actionable(&self) -> bool {
        self.0.positive().next().is_some()
    }

    /// The first removed product with a positive quantity; its category and
    /// subtype define replacement affinity.
    pub fn primary(&self) -> Option<&LineItem> {
        self.0.positive().next()
    }
}

/// Products the operator reports as physically on hand. Empty means "search
/// the full catalog".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilitySet(LineItems);

impl AvailabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = LineItem>) -> Self {
        Self(LineItems::from_items(items))
    }

    pub fn add(&mut self, item: LineItem) {
        self.0.add(item);
    }

    pub fn remove(&mut self, product_id: ProductId) -> Option<LineItem> {
        self.0.remove(product_id)
    }

    pub fn items(&self) -> &[LineItem] {
        self.0.items()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Products on hand, in the order they were added. Quantities are not
    /// consulted when building bundles.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.0.items().iter().map(|i| &i.product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldrep_catalog::ProductSubtype;

    fn product(name: &str, price: u64) -> Product {
        Product::new(
            ProductId::new(),
            name,
            "beverages",
            ProductSubtype::Standard,
            Money::from_minor(price),
        )
        .unwrap()
    }

    #[test]
    fn removed_value_sums_price_times_quantity() {
        let removed = RemovalSet::from_items(vec![
            LineItem::new(product("Cola 1L", 199), 3),
            LineItem::new(product("Lemonade 1L", 150), 2),
        ]);
        assert_eq!(removed.removed_value(), Money::from_minor(897));
    }

    #[test]
    fn adding_same_product_merges_quantity() {
        let cola = product("Cola 1L", 199);
        let mut removed = RemovalSet::new();
        removed.add(LineItem::new(cola.clone(), 2));
        removed.add(LineItem::new(cola.clone(), 1));

        assert_eq!(removed.items().len(), 1);
        assert_eq!(removed.items()[0].quantity, 3);
    }

    #[test]
    fn zero_quantity_lines_are_not_actionable() {
        let water = product("Water", 50);
        let cola = product("Cola", 199);
        let mut removed = RemovalSet::from_items(vec![LineItem::new(water.clone(), 0)]);
        assert!(!removed.is_actionable());
        assert!(removed.primary().is_none());

        removed.add(LineItem::new(cola.clone(), 1));
        assert!(removed.is_actionable());
        assert_eq!(removed.primary().map(LineItem::product_id), Some(cola.id_typed()));
    }

    #[test]
    fn remove_drops_line() {
        let cola = product("Cola", 199);
        let mut available = AvailabilitySet::from_items(vec![LineItem::new(cola.clone(), 4)]);
        assert!(!available.is_empty());
        assert!(available.remove(cola.id_typed()).is_some());
        assert!(available.is_empty());
        assert!(available.remove(cola.id_typed()).is_none());
    }

    #[test]
    fn set_quantity_only_touches_existing_lines() {
        let cola = product("Cola", 199);
        let mut items = LineItems::from_items(vec![LineItem::new(cola.clone(), 1)]);
        assert!(items.set_quantity(cola.id_typed(), 5));
        assert!(!items.set_quantity(ProductId::new(), 5));
        assert_eq!(items.total_value(), Money::from_minor(995));
    }
}
