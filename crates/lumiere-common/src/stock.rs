//! Per-size inventory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Default ceiling at or below which a size counts as running low.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    InStock,
    Low,
    OutOfStock,
}

/// Units on hand for each size label of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeStocks(BTreeMap<String, u32>);

impl SizeStocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, size: &str) -> u32 {
        self.0.get(size).copied().unwrap_or(0)
    }

    pub fn contains(&self, size: &str) -> bool {
        self.0.contains_key(size)
    }

    pub fn set(&mut self, size: impl Into<String>, units: u32) {
        self.0.insert(size.into(), units);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(size, units)| (size.as_str(), *units))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A product is in stock when any of its sizes has units left.
    pub fn in_stock(&self) -> bool {
        self.0.values().any(|&units| units > 0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().fold(0u32, |sum, &units| sum.saturating_add(units))
    }

    /// Classify the product for the inventory view.
    ///
    /// An empty map counts as out of stock.
    pub fn level(&self, threshold: u32) -> StockLevel {
        if self.0.values().all(|&units| units == 0) {
            StockLevel::OutOfStock
        } else if self.0.values().any(|&units| units > 0 && units <= threshold) {
            StockLevel::Low
        } else {
            StockLevel::InStock
        }
    }

    /// Add `amount` units to `size`, creating the entry if needed.
    pub fn restock(&mut self, size: &str, amount: u32) -> Result<u32, DomainError> {
        if size.trim().is_empty() {
            return Err(DomainError::MissingField { field: "size" });
        }
        if amount == 0 {
            return Err(DomainError::InvalidRestockAmount);
        }
        let units = self.0.entry(size.to_string()).or_insert(0);
        *units = units.saturating_add(amount);
        Ok(*units)
    }

    /// Take `quantity` units of `size`. Leaves the map untouched on failure.
    pub fn reserve(&mut self, size: &str, quantity: u32) -> Result<u32, DomainError> {
        let Some(units) = self.0.get_mut(size) else {
            return Err(DomainError::UnknownSize {
                size: size.to_string(),
            });
        };
        if *units < quantity {
            return Err(DomainError::InsufficientStock {
                size: size.to_string(),
                requested: quantity,
                available: *units,
            });
        }
        *units -= quantity;
        Ok(*units)
    }

    /// Return `quantity` units of `size`, e.g. when an order is cancelled.
    pub fn release(&mut self, size: &str, quantity: u32) -> u32 {
        let units = self.0.entry(size.to_string()).or_insert(0);
        *units = units.saturating_add(quantity);
        *units
    }
}

impl FromIterator<(String, u32)> for SizeStocks {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, u32); N]> for SizeStocks {
    fn from(entries: [(&str, u32); N]) -> Self {
        entries
            .into_iter()
            .map(|(size, units)| (size.to_string(), units))
            .collect()
    }
}
