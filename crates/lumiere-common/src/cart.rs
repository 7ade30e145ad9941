//! Shopping cart state and its reducer.
//!
//! The cart is client-held state: the storefront keeps it in the browser and
//! sends it back for quoting and checkout. Every line is capped at the stock
//! that was available for its size when it was added, and [`reconcile`]
//! re-checks a returning cart against the live catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::product::Product;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Line identifier, `"{product_id}-{size}"`.
    pub id: String,
    #[serde(default)]
    pub product_id: String,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub image: String,
    pub size: String,
    pub quantity: u32,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    /// Units available for this size when the line was added. `None` is unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl CartItem {
    pub fn line_id(product_id: &str, size: &str) -> String {
        format!("{}-{}", product_id, size)
    }

    /// A line for `quantity` bottles of `product` in `size`, priced from the catalog.
    pub fn for_product(product: &Product, size: &str, quantity: u32) -> Result<Self, DomainError> {
        let price = product
            .price_of(size)
            .filter(|_| product.offers(size))
            .ok_or_else(|| DomainError::UnknownSize {
                size: size.to_string(),
            })?;
        Ok(Self {
            id: Self::line_id(&product.id, size),
            product_id: product.id.clone(),
            name: product.name.clone(),
            price,
            image: product.image().to_string(),
            size: size.to_string(),
            quantity,
            in_stock: product.in_stock,
            stock: Some(product.stock_of(size)),
        })
    }

    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }

    fn cap(&self, quantity: u32) -> u32 {
        match self.stock {
            Some(stock) => quantity.min(stock),
            None => quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartAction {
    AddItem(CartItem),
    RemoveItem(String),
    UpdateQuantity { id: String, quantity: i64 },
    Clear,
    Load(Cart),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

/// Cart with its derived totals, as the storefront renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub total: Money,
    pub item_count: u32,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce(&mut self, action: CartAction) {
        match action {
            CartAction::AddItem(item) => self.add(item),
            CartAction::RemoveItem(id) => self.remove(&id),
            CartAction::UpdateQuantity { id, quantity } => self.update_quantity(&id, quantity),
            CartAction::Clear => self.clear(),
            CartAction::Load(cart) => *self = cart.sanitized(),
        }
    }

    /// Add a line, merging with an existing line of the same id.
    pub fn add(&mut self, item: CartItem) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            let requested = existing.quantity.saturating_add(item.quantity);
            existing.quantity = item.cap(requested);
            existing.stock = item.stock;
        } else {
            let quantity = item.cap(item.quantity);
            self.items.push(CartItem { quantity, ..item });
        }
        self.drop_empty_lines();
    }

    pub fn remove(&mut self, id: &str) {
        self.items.retain(|item| item.id != id);
    }

    /// Set a line's quantity. Zero or less removes the line.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove(id);
            return;
        }
        let requested = u32::try_from(quantity).unwrap_or(u32::MAX);
        if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
            item.quantity = item.cap(requested);
        }
        self.drop_empty_lines();
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, item| count.saturating_add(item.quantity))
    }

    pub fn view(&self) -> CartView {
        CartView {
            items: self.items.clone(),
            total: self.total(),
            item_count: self.item_count(),
        }
    }

    /// Fill in identifiers older saved carts lack and drop empty lines.
    fn sanitized(mut self) -> Self {
        for item in &mut self.items {
            if item.product_id.is_empty() {
                let suffix = format!("-{}", item.size);
                item.product_id = item
                    .id
                    .strip_suffix(&suffix)
                    .unwrap_or(&item.id)
                    .to_string();
            }
        }
        self.drop_empty_lines();
        self
    }

    fn drop_empty_lines(&mut self) {
        self.items.retain(|item| item.quantity > 0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    ProductUnavailable,
    SizeUnavailable,
    OutOfStock,
}

/// A change made while re-checking a cart against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartAdjustment {
    Removed { id: String, reason: RemovalReason },
    QuantityReduced { id: String, from: u32, to: u32 },
    PriceChanged { id: String, from: Money, to: Money },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub cart: CartView,
    pub adjustments: Vec<CartAdjustment>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.adjustments.is_empty()
    }
}

/// Re-price and re-cap every line of `cart` against current products.
///
/// Lines sharing an id are merged, and the cap is checked against their
/// combined quantity.
pub fn reconcile<'a, F>(cart: &Cart, lookup: F) -> (Cart, Vec<CartAdjustment>)
where
    F: Fn(&str) -> Option<&'a Product>,
{
    let mut fresh = Cart::new();
    let mut adjustments = Vec::new();
    let mut requested: BTreeMap<String, u32> = BTreeMap::new();

    for line in cart.clone().sanitized().items {
        let Some(product) = lookup(&line.product_id) else {
            adjustments.push(CartAdjustment::Removed {
                id: line.id,
                reason: RemovalReason::ProductUnavailable,
            });
            continue;
        };
        let Ok(current) = CartItem::for_product(product, &line.size, line.quantity) else {
            adjustments.push(CartAdjustment::Removed {
                id: line.id,
                reason: RemovalReason::SizeUnavailable,
            });
            continue;
        };

        let available = current.stock.unwrap_or(0);
        if available == 0 {
            adjustments.push(CartAdjustment::Removed {
                id: current.id,
                reason: RemovalReason::OutOfStock,
            });
            continue;
        }
        if current.price != line.price {
            adjustments.push(CartAdjustment::PriceChanged {
                id: current.id.clone(),
                from: line.price,
                to: current.price,
            });
        }
        let asked = requested.entry(current.id.clone()).or_insert(0);
        *asked = asked.saturating_add(line.quantity);
        fresh.add(current);
    }

    for item in &fresh.items {
        let asked = requested.get(&item.id).copied().unwrap_or(0);
        if asked > item.quantity {
            adjustments.push(CartAdjustment::QuantityReduced {
                id: item.id.clone(),
                from: asked,
                to: item.quantity,
            });
        }
    }

    (fresh, adjustments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::product::{Category, ProductDraft};
    use crate::stock::SizeStocks;
    use chrono::Utc;

    fn item(id: &str, price: f64, quantity: u32, stock: Option<u32>) -> CartItem {
        CartItem {
            id: id.to_string(),
            product_id: id.split('-').next().unwrap_or_default().to_string(),
            name: "Ocean Breeze".to_string(),
            price: Money::from_dollars(price),
            image: String::new(),
            size: id.split('-').nth(1).unwrap_or("50ml").to_string(),
            quantity,
            in_stock: true,
            stock,
        }
    }

    fn ocean_breeze() -> Product {
        let mut draft = ProductDraft::new("Ocean Breeze", Category::Fresh, Money::from_dollars(16.5));
        draft.sizes = vec!["30ml".into(), "50ml".into(), "100ml".into()];
        draft.size_stocks = SizeStocks::from([("30ml", 5), ("50ml", 8), ("100ml", 0)]);
        draft
            .into_product("p2".into(), Utc::now(), Utc::now(), None)
            .unwrap()
    }

    #[test]
    fn add_merges_lines_and_caps_at_stock() {
        let mut cart = Cart::new();
        cart.reduce(CartAction::AddItem(item("p2-50ml", 82.5, 5, Some(8))));
        cart.reduce(CartAction::AddItem(item("p2-50ml", 82.5, 5, Some(8))));
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 8);
        assert_eq!(cart.item_count(), 8);
        assert_eq!(cart.total(), Money::from_dollars(660.0));
    }

    #[test]
    fn new_line_is_capped_and_unbounded_without_stock() {
        let mut cart = Cart::new();
        cart.add(item("p2-30ml", 49.5, 9, Some(5)));
        cart.add(item("p3-50ml", 10.0, 40, None));
        assert_eq!(cart.get("p2-30ml").map(|i| i.quantity), Some(5));
        assert_eq!(cart.get("p3-50ml").map(|i| i.quantity), Some(40));
    }

    #[test]
    fn zero_quantity_add_leaves_no_line() {
        let mut cart = Cart::new();
        cart.add(item("p2-100ml", 165.0, 1, Some(0)));
        assert!(cart.is_empty());
    }

    #[test]
    fn update_quantity_caps_and_removes() {
        let mut cart = Cart::new();
        cart.add(item("p2-50ml", 82.5, 1, Some(8)));
        cart.reduce(CartAction::UpdateQuantity {
            id: "p2-50ml".into(),
            quantity: 20,
        });
        assert_eq!(cart.items[0].quantity, 8);
        cart.reduce(CartAction::UpdateQuantity {
            id: "p2-50ml".into(),
            quantity: 0,
        });
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(item("p2-50ml", 82.5, 1, None));
        cart.add(item("p2-30ml", 49.5, 1, None));
        cart.reduce(CartAction::RemoveItem("p2-50ml".into()));
        assert_eq!(cart.items.len(), 1);
        cart.reduce(CartAction::Clear);
        assert_eq!(cart.total(), Money::ZERO);
    }

    #[test]
    fn load_defaults_missing_fields() {
        let saved = serde_json::json!({
            "items": [{"id": "p2-50ml", "name": "Ocean Breeze", "price": 82.5, "size": "50ml", "quantity": 2}],
            "total": 165.0,
            "itemCount": 2
        });
        let loaded: Cart = serde_json::from_value(saved).unwrap();
        let mut cart = Cart::new();
        cart.reduce(CartAction::Load(loaded));
        let line = &cart.items[0];
        assert!(line.in_stock);
        assert_eq!(line.stock, None);
        assert_eq!(line.product_id, "p2");
    }

    #[test]
    fn action_uses_tagged_json() {
        let action: CartAction = serde_json::from_value(serde_json::json!({
            "type": "UPDATE_QUANTITY",
            "payload": {"id": "p2-50ml", "quantity": 3}
        }))
        .unwrap();
        assert_eq!(
            action,
            CartAction::UpdateQuantity {
                id: "p2-50ml".into(),
                quantity: 3
            }
        );
    }

    #[test]
    fn for_product_prices_from_catalog() {
        let product = ocean_breeze();
        let line = CartItem::for_product(&product, "50ml", 2).unwrap();
        assert_eq!(line.id, "p2-50ml");
        assert_eq!(line.price, Money::from_dollars(82.5));
        assert_eq!(line.stock, Some(8));
        assert!(CartItem::for_product(&product, "75ml", 1).is_err());
    }

    #[test]
    fn reconcile_reports_every_adjustment() {
        let product = ocean_breeze();
        let mut cart = Cart::new();
        cart.add(item("p2-50ml", 80.0, 12, None));
        cart.add(item("p2-100ml", 165.0, 1, None));
        cart.add(item("p2-75ml", 120.0, 1, None));
        cart.add(item("gone-50ml", 10.0, 1, None));

        let (fresh, adjustments) =
            reconcile(&cart, |id| (id == "p2").then_some(&product));

        assert_eq!(fresh.items.len(), 1);
        assert_eq!(fresh.items[0].quantity, 8);
        assert_eq!(fresh.items[0].price, Money::from_dollars(82.5));
        assert!(adjustments.contains(&CartAdjustment::QuantityReduced {
            id: "p2-50ml".into(),
            from: 12,
            to: 8
        }));
        assert!(adjustments.contains(&CartAdjustment::PriceChanged {
            id: "p2-50ml".into(),
            from: Money::from_dollars(80.0),
            to: Money::from_dollars(82.5)
        }));
        assert!(adjustments.contains(&CartAdjustment::Removed {
            id: "p2-100ml".into(),
            reason: RemovalReason::OutOfStock
        }));
        assert!(adjustments.contains(&CartAdjustment::Removed {
            id: "p2-75ml".into(),
            reason: RemovalReason::SizeUnavailable
        }));
        assert!(adjustments.contains(&CartAdjustment::Removed {
            id: "gone-50ml".into(),
            reason: RemovalReason::ProductUnavailable
        }));
    }

    #[test]
    fn reconcile_caps_duplicate_lines_together() {
        let product = ocean_breeze();
        let cart = Cart {
            items: vec![
                item("p2-50ml", 82.5, 5, None),
                item("p2-50ml", 82.5, 5, None),
            ],
        };

        let (fresh, adjustments) = reconcile(&cart, |id| (id == "p2").then_some(&product));

        assert_eq!(fresh.items.len(), 1);
        assert_eq!(fresh.items[0].quantity, 8);
        assert_eq!(
            adjustments,
            vec![CartAdjustment::QuantityReduced {
                id: "p2-50ml".into(),
                from: 10,
                to: 8
            }]
        );
    }

    #[test]
    fn reconcile_keeps_duplicate_lines_within_stock() {
        let product = ocean_breeze();
        let cart = Cart {
            items: vec![
                item("p2-50ml", 82.5, 3, None),
                item("p2-50ml", 82.5, 4, None),
            ],
        };

        let (fresh, adjustments) = reconcile(&cart, |id| (id == "p2").then_some(&product));

        assert_eq!(fresh.items[0].quantity, 7);
        assert!(adjustments.is_empty());
    }
}
