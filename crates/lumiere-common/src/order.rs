//! Orders, their fulfilment flags, and the events they emit.
//!
//! An order carries a status (`pending`, `confirmed`, `cancelled`) and two
//! independent shipment flags. `delivered` can only be set while `shipped`
//! is set, and cancelling an order clears both.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::error::DomainError;
use crate::money::Money;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [Self::Pending, Self::Confirmed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(DomainError::InvalidValue {
                kind: "order status",
                value: s.to_string(),
            }),
        }
    }
}

/// A customer-facing milestone that triggers a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderEvent {
    Pending,
    Confirmed,
    Cancelled,
    Shipped,
    Delivered,
}

impl OrderEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }

    /// Key under which a notification for this event is sent at most once.
    pub fn dedupe_key(&self, order_number: &str) -> String {
        format!("{}-{}", order_number, self.as_str())
    }
}

impl fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Cart line id, `"{product_id}-{size}"`.
    pub id: String,
    #[serde(default)]
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
    pub size: String,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.clone(),
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            price: item.price,
            size: item.size.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub customer_name: String,
    pub email: String,
    pub items: Vec<OrderLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    #[serde(default)]
    pub discount_amount: Money,
    pub total: Money,
    pub item_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    pub status: OrderStatus,
    pub date: DateTime<Utc>,
    pub shipping_address: String,
    #[serde(default)]
    pub shipped: bool,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

/// `"#LUM{unix_millis}-{suffix}"`, with the suffix folded into 0..=999.
pub fn generate_order_number(now: DateTime<Utc>, suffix: u32) -> String {
    format!("#LUM{}-{}", now.timestamp_millis(), suffix % 1000)
}

/// Admin change to an order. Absent fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipped: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered: Option<bool>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn shipped(shipped: bool) -> Self {
        Self {
            shipped: Some(shipped),
            ..Self::default()
        }
    }

    pub fn delivered(delivered: bool) -> Self {
        Self {
            delivered: Some(delivered),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.shipped.is_none() && self.delivered.is_none()
    }
}

/// What a status change does to reserved stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMove {
    Reserve,
    Release,
}

impl StockMove {
    pub fn between(from: OrderStatus, to: OrderStatus) -> Option<Self> {
        match (from, to) {
            (OrderStatus::Cancelled, OrderStatus::Cancelled) => None,
            (_, OrderStatus::Cancelled) => Some(Self::Release),
            (OrderStatus::Cancelled, _) => Some(Self::Reserve),
            _ => None,
        }
    }
}

impl Order {
    /// Units per `(product_id, size)` across all lines.
    pub fn stock_requirements(&self) -> BTreeMap<(String, String), u32> {
        let mut needed = BTreeMap::new();
        for line in &self.items {
            let units = needed
                .entry((line.product_id.clone(), line.size.clone()))
                .or_insert(0u32);
            *units = units.saturating_add(line.quantity);
        }
        needed
    }

    /// Case-insensitive match on order number, customer name, or email.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.order_number.to_lowercase().contains(&query)
            || self.customer_name.to_lowercase().contains(&query)
            || self.email.to_lowercase().contains(&query)
    }

    /// Apply an admin change and return the events it produced.
    ///
    /// On error the order is left untouched.
    pub fn apply_patch(&mut self, patch: OrderPatch) -> Result<Vec<OrderEvent>, DomainError> {
        let status = patch.status.unwrap_or(self.status);
        let mut shipped = patch.shipped.unwrap_or(self.shipped);
        let mut delivered = patch.delivered.unwrap_or(self.delivered);

        if status == OrderStatus::Cancelled {
            if patch.shipped == Some(true) || patch.delivered == Some(true) {
                return Err(DomainError::ShipCancelledOrder);
            }
            shipped = false;
            delivered = false;
        } else if !shipped {
            if patch.delivered == Some(true) {
                return Err(DomainError::DeliveredBeforeShipped);
            }
            delivered = false;
        }

        let mut events = Vec::new();
        if status != self.status {
            match status {
                OrderStatus::Confirmed => events.push(OrderEvent::Confirmed),
                OrderStatus::Cancelled => events.push(OrderEvent::Cancelled),
                OrderStatus::Pending => {}
            }
        }
        if shipped && !self.shipped && status == OrderStatus::Confirmed {
            events.push(OrderEvent::Shipped);
        }
        if delivered && !self.delivered {
            events.push(OrderEvent::Delivered);
        }

        self.status = status;
        self.shipped = shipped;
        self.delivered = delivered;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order {
            id: "o1".into(),
            order_number: "#LUM1748779200000-42".into(),
            customer_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            items: vec![
                OrderLine {
                    id: "p1-50ml".into(),
                    product_id: "p1".into(),
                    name: "Midnight Rose".into(),
                    quantity: 2,
                    price: Money::from_dollars(92.5),
                    size: "50ml".into(),
                },
                OrderLine {
                    id: "p1-50ml".into(),
                    product_id: "p1".into(),
                    name: "Midnight Rose".into(),
                    quantity: 1,
                    price: Money::from_dollars(92.5),
                    size: "50ml".into(),
                },
            ],
            subtotal: Money::from_dollars(277.5),
            tax: Money::from_dollars(22.2),
            shipping: Money::ZERO,
            discount_amount: Money::ZERO,
            total: Money::from_dollars(299.7),
            item_count: 3,
            promo_code: None,
            status: OrderStatus::Pending,
            date: DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            shipping_address: "1 Main St, Springfield, 12345, US".into(),
            shipped: false,
            delivered: false,
            payment_intent_id: None,
        }
    }

    #[test]
    fn order_number_format() {
        let now = DateTime::from_timestamp_millis(1_748_779_200_123).unwrap();
        assert_eq!(generate_order_number(now, 1042), "#LUM1748779200123-42");
    }

    #[test]
    fn delivered_requires_shipped() {
        let mut o = order();
        let before = o.clone();
        assert_eq!(
            o.apply_patch(OrderPatch::delivered(true)),
            Err(DomainError::DeliveredBeforeShipped)
        );
        assert_eq!(o, before);
    }

    #[test]
    fn ship_and_deliver_in_one_patch() {
        let mut o = order();
        let events = o
            .apply_patch(OrderPatch {
                status: Some(OrderStatus::Confirmed),
                shipped: Some(true),
                delivered: Some(true),
            })
            .unwrap();
        assert_eq!(
            events,
            vec![OrderEvent::Confirmed, OrderEvent::Shipped, OrderEvent::Delivered]
        );
        assert!(o.shipped && o.delivered);
    }

    #[test]
    fn unshipping_clears_delivered() {
        let mut o = order();
        o.status = OrderStatus::Confirmed;
        o.shipped = true;
        o.delivered = true;
        let events = o.apply_patch(OrderPatch::shipped(false)).unwrap();
        assert!(events.is_empty());
        assert!(!o.delivered);
    }

    #[test]
    fn shipping_a_pending_order_sends_no_email() {
        let mut o = order();
        let events = o.apply_patch(OrderPatch::shipped(true)).unwrap();
        assert!(events.is_empty());
        assert!(o.shipped);
    }

    #[test]
    fn cancelling_clears_shipment_flags() {
        let mut o = order();
        o.status = OrderStatus::Confirmed;
        o.shipped = true;
        o.delivered = true;
        let events = o.apply_patch(OrderPatch::status(OrderStatus::Cancelled)).unwrap();
        assert_eq!(events, vec![OrderEvent::Cancelled]);
        assert!(!o.shipped && !o.delivered);

        assert_eq!(
            o.apply_patch(OrderPatch::shipped(true)),
            Err(DomainError::ShipCancelledOrder)
        );
    }

    #[test]
    fn unchanged_status_emits_nothing() {
        let mut o = order();
        o.status = OrderStatus::Confirmed;
        let events = o.apply_patch(OrderPatch::status(OrderStatus::Confirmed)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn stock_moves_only_across_cancellation() {
        use OrderStatus::*;
        assert_eq!(StockMove::between(Pending, Cancelled), Some(StockMove::Release));
        assert_eq!(StockMove::between(Confirmed, Cancelled), Some(StockMove::Release));
        assert_eq!(StockMove::between(Cancelled, Confirmed), Some(StockMove::Reserve));
        assert_eq!(StockMove::between(Cancelled, Cancelled), None);
        assert_eq!(StockMove::between(Pending, Confirmed), None);
    }

    #[test]
    fn stock_requirements_merge_duplicate_lines() {
        let needed = order().stock_requirements();
        assert_eq!(needed[&("p1".to_string(), "50ml".to_string())], 3);
    }

    #[test]
    fn search_matches_number_name_and_email() {
        let o = order();
        assert!(o.matches_search("lum1748"));
        assert!(o.matches_search("lovelace"));
        assert!(o.matches_search("EXAMPLE.COM"));
        assert!(!o.matches_search("grace"));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(order()).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["orderNumber"], "#LUM1748779200000-42");
        assert_eq!("Canceled".parse::<OrderStatus>(), Ok(OrderStatus::Cancelled));
    }

    #[test]
    fn dedupe_key_combines_number_and_event() {
        assert_eq!(OrderEvent::Shipped.dedupe_key("#LUM1-2"), "#LUM1-2-shipped");
    }
}
