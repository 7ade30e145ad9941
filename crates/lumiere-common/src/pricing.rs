//! Size pricing and checkout totals.
//!
//! Every size of a fragrance is priced linearly from its price per 10 ml:
//! `price = (ml / 10) × price_per_10ml`, rounded to the cent. Checkout totals
//! add a flat tax rate, a shipping fee waived above a threshold, and an
//! optional promo discount taken off the subtotal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::size::parse_ml;

/// Price of one bottle of `ml` millilitres.
pub fn price_for_size(price_per_10ml: Money, ml: u32) -> Money {
    price_per_10ml.scale(ml, 10)
}

/// Price every size whose label carries a volume.
///
/// Returns an empty map when the rate is not positive.
pub fn calculate_prices(price_per_10ml: Money, sizes: &[String]) -> BTreeMap<String, Money> {
    if !price_per_10ml.is_positive() {
        return BTreeMap::new();
    }
    sizes
        .iter()
        .filter_map(|label| {
            parse_ml(label)
                .filter(|&ml| ml > 0)
                .map(|ml| (label.clone(), price_for_size(price_per_10ml, ml)))
        })
        .collect()
}

/// The display price of a product: the price of its smallest priced size.
pub fn base_price(sizes: &[String], prices: &BTreeMap<String, Money>) -> Option<Money> {
    sizes
        .iter()
        .filter_map(|label| prices.get(label).map(|price| (parse_ml(label).unwrap_or(0), *price)))
        .min_by_key(|(ml, _)| *ml)
        .map(|(_, price)| price)
}

/// Totals shown on the cart page and charged at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub item_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

impl PriceBreakdown {
    /// Amount to hand to the payment processor, in the smallest currency unit.
    pub fn amount_in_cents(&self) -> i64 {
        self.total.cents()
    }
}

/// Store-wide pricing rules.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingPolicy {
    pub tax_rate: f64,
    pub free_shipping_over: Money,
    pub flat_shipping: Money,
    /// Upper-cased promo code → fractional discount (`0.1` for 10%).
    pub promo_codes: BTreeMap<String, f64>,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: 0.08,
            free_shipping_over: Money::from_cents(150_00),
            flat_shipping: Money::from_cents(15_00),
            promo_codes: default_promo_codes(),
        }
    }
}

pub fn default_promo_codes() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("WELCOME10".to_string(), 0.10),
        ("SAVE20".to_string(), 0.20),
        ("LUXURY15".to_string(), 0.15),
    ])
}

impl PricingPolicy {
    /// Resolve a promo code, ignoring case and surrounding whitespace.
    ///
    /// Returns the canonical (upper-cased) code and its rate.
    pub fn promo(&self, code: &str) -> Result<(String, f64), DomainError> {
        let upper = code.trim().to_uppercase();
        match self.promo_codes.get(&upper) {
            Some(&rate) => Ok((upper, rate)),
            None => Err(DomainError::UnknownPromoCode {
                code: code.trim().to_string(),
            }),
        }
    }

    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal > self.free_shipping_over {
            Money::ZERO
        } else {
            self.flat_shipping
        }
    }

    pub fn breakdown(
        &self,
        subtotal: Money,
        item_count: u32,
        promo_code: Option<&str>,
    ) -> Result<PriceBreakdown, DomainError> {
        let (promo_code, rate) = match promo_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                let (canonical, rate) = self.promo(code)?;
                (Some(canonical), rate)
            }
            None => (None, 0.0),
        };

        let tax = subtotal.percent(self.tax_rate);
        let shipping = self.shipping_for(subtotal);
        let discount_amount = subtotal.percent(rate);
        let total = subtotal + tax + shipping - discount_amount;

        Ok(PriceBreakdown {
            subtotal,
            tax,
            shipping,
            discount_amount,
            total,
            item_count,
            promo_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn prices_scale_linearly_with_volume() {
        let rate = Money::from_dollars(18.5);
        let prices = calculate_prices(rate, &sizes(&["30ml", "50ml", "100ml"]));
        assert_eq!(prices["30ml"], Money::from_dollars(55.5));
        assert_eq!(prices["50ml"], Money::from_dollars(92.5));
        assert_eq!(prices["100ml"], Money::from_dollars(185.0));
    }

    #[test]
    fn skips_unpriceable_sizes_and_zero_rate() {
        let prices = calculate_prices(Money::from_dollars(16.5), &sizes(&["Gift Set", "0ml", "50ml"]));
        assert_eq!(prices.len(), 1);
        assert!(calculate_prices(Money::ZERO, &sizes(&["50ml"])).is_empty());
    }

    #[test]
    fn base_price_is_smallest_size() {
        let labels = sizes(&["100ml", "30ml", "50ml"]);
        let prices = calculate_prices(Money::from_dollars(21.0), &labels);
        assert_eq!(base_price(&labels, &prices), Some(Money::from_dollars(63.0)));
        assert_eq!(base_price(&labels, &BTreeMap::new()), None);
    }

    #[test]
    fn breakdown_below_free_shipping_threshold() {
        let policy = PricingPolicy::default();
        let b = policy.breakdown(Money::from_dollars(100.0), 2, None).unwrap();
        assert_eq!(b.tax, Money::from_dollars(8.0));
        assert_eq!(b.shipping, Money::from_dollars(15.0));
        assert_eq!(b.discount_amount, Money::ZERO);
        assert_eq!(b.total, Money::from_dollars(123.0));
        assert_eq!(b.amount_in_cents(), 12300);
    }

    #[test]
    fn shipping_is_free_strictly_above_threshold() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.shipping_for(Money::from_dollars(150.0)), Money::from_dollars(15.0));
        assert_eq!(policy.shipping_for(Money::from_dollars(150.01)), Money::ZERO);
    }

    #[test]
    fn promo_code_is_case_insensitive_and_discounts_subtotal() {
        let policy = PricingPolicy::default();
        let b = policy
            .breakdown(Money::from_dollars(200.0), 1, Some(" save20 "))
            .unwrap();
        assert_eq!(b.promo_code.as_deref(), Some("SAVE20"));
        assert_eq!(b.discount_amount, Money::from_dollars(40.0));
        // 200 + 16 tax + 0 shipping - 40
        assert_eq!(b.total, Money::from_dollars(176.0));
    }

    #[test]
    fn unknown_promo_code_is_an_error() {
        let policy = PricingPolicy::default();
        let err = policy
            .breakdown(Money::from_dollars(10.0), 1, Some("FREESTUFF"))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::UnknownPromoCode {
                code: "FREESTUFF".into()
            }
        );
    }

    #[test]
    fn blank_promo_code_is_ignored() {
        let policy = PricingPolicy::default();
        let b = policy.breakdown(Money::from_dollars(10.0), 1, Some("  ")).unwrap();
        assert!(b.promo_code.is_none());
    }
}
