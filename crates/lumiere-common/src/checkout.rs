//! Checkout form handling and order drafting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::{Cart, CartItem};
use crate::error::DomainError;
use crate::order::{generate_order_number, Order, OrderLine, OrderStatus};
use crate::pricing::{PriceBreakdown, PricingPolicy};

/// Contact and shipping details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

impl CheckoutForm {
    pub fn validate(&self) -> Result<(), DomainError> {
        let fields = [
            ("email", &self.email),
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("zipCode", &self.zip_code),
            ("country", &self.country),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(DomainError::MissingField { field: *field });
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(DomainError::InvalidEmail {
                email: email.to_string(),
            }),
        }
    }

    pub fn customer_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    pub fn shipping_address(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.address.trim(),
            self.city.trim(),
            self.zip_code.trim(),
            self.country.trim()
        )
    }
}

/// Body of a quote request: the client's cart lines and an optional promo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

/// Body of an order placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub form: CheckoutForm,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

impl CheckoutRequest {
    pub fn cart(&self) -> Cart {
        Cart {
            items: self.items.clone(),
        }
    }
}

/// Totals for `cart` under `policy`.
pub fn quote(
    cart: &Cart,
    policy: &PricingPolicy,
    promo_code: Option<&str>,
) -> Result<PriceBreakdown, DomainError> {
    policy.breakdown(cart.total(), cart.item_count(), promo_code)
}

/// A new pending, unshipped order for `cart`.
pub fn draft_order(
    form: &CheckoutForm,
    cart: &Cart,
    breakdown: &PriceBreakdown,
    payment_intent_id: Option<String>,
    now: DateTime<Utc>,
    suffix: u32,
) -> Result<Order, DomainError> {
    form.validate()?;
    if cart.is_empty() {
        return Err(DomainError::EmptyCart);
    }

    Ok(Order {
        id: Uuid::new_v4().to_string(),
        order_number: generate_order_number(now, suffix),
        customer_name: form.customer_name(),
        email: form.email.trim().to_string(),
        items: cart.items.iter().map(OrderLine::from).collect(),
        subtotal: breakdown.subtotal,
        tax: breakdown.tax,
        shipping: breakdown.shipping,
        discount_amount: breakdown.discount_amount,
        total: breakdown.total,
        item_count: breakdown.item_count,
        promo_code: breakdown.promo_code.clone(),
        status: OrderStatus::Pending,
        date: now,
        shipping_address: form.shipping_address(),
        shipped: false,
        delivered: false,
        payment_intent_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn form() -> CheckoutForm {
        CheckoutForm {
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            address: "12 St James's Square".into(),
            city: "London".into(),
            zip_code: "SW1Y 4JH".into(),
            country: "UK".into(),
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(CartItem {
            id: "p1-50ml".into(),
            product_id: "p1".into(),
            name: "Midnight Rose".into(),
            price: Money::from_dollars(92.5),
            image: String::new(),
            size: "50ml".into(),
            quantity: 2,
            in_stock: true,
            stock: Some(45),
        });
        cart
    }

    #[test]
    fn validate_names_first_missing_field() {
        let mut f = form();
        f.city = "  ".into();
        assert_eq!(f.validate(), Err(DomainError::MissingField { field: "city" }));
    }

    #[test]
    fn validate_rejects_email_without_at() {
        let mut f = form();
        f.email = "ada.example.com".into();
        assert!(matches!(f.validate(), Err(DomainError::InvalidEmail { .. })));
        f.email = "@example.com".into();
        assert!(f.validate().is_err());
    }

    #[test]
    fn formats_name_and_address() {
        let f = form();
        assert_eq!(f.customer_name(), "Ada Lovelace");
        assert_eq!(f.shipping_address(), "12 St James's Square, London, SW1Y 4JH, UK");
    }

    #[test]
    fn draft_order_takes_totals_from_breakdown() {
        let policy = PricingPolicy::default();
        let cart = cart();
        let breakdown = quote(&cart, &policy, Some("welcome10")).unwrap();
        let now = DateTime::from_timestamp_millis(1_748_779_200_000).unwrap();
        let order = draft_order(&form(), &cart, &breakdown, Some("pi_123".into()), now, 7).unwrap();

        assert_eq!(order.order_number, "#LUM1748779200000-7");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.shipped && !order.delivered);
        assert_eq!(order.subtotal, Money::from_dollars(185.0));
        assert_eq!(order.discount_amount, Money::from_dollars(18.5));
        // 185 + 14.80 tax + 0 shipping - 18.50
        assert_eq!(order.total, Money::from_dollars(181.3));
        assert_eq!(order.item_count, 2);
        assert_eq!(order.promo_code.as_deref(), Some("WELCOME10"));
        assert_eq!(order.items[0].product_id, "p1");
    }

    #[test]
    fn draft_order_rejects_empty_cart() {
        let breakdown = quote(&Cart::new(), &PricingPolicy::default(), None).unwrap();
        let err = draft_order(&form(), &Cart::new(), &breakdown, None, Utc::now(), 0).unwrap_err();
        assert_eq!(err, DomainError::EmptyCart);
    }

    #[test]
    fn checkout_request_reads_flat_form_fields() {
        let req: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "email": "ada@example.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "address": "1 Main St",
            "city": "Springfield",
            "zipCode": "12345",
            "country": "US",
            "items": [],
            "promoCode": "SAVE20"
        }))
        .unwrap();
        assert_eq!(req.form.zip_code, "12345");
        assert_eq!(req.promo_code.as_deref(), Some("SAVE20"));
        assert!(req.payment_intent_id.is_none());
    }
}
