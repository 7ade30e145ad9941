//! Collection page filtering and sorting.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::product::{Category, Product};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceRange {
    #[default]
    All,
    #[serde(rename = "under-170")]
    Under170,
    #[serde(rename = "170-200")]
    From170To200,
    #[serde(rename = "over-200")]
    Over200,
}

impl PriceRange {
    pub fn contains(&self, price: Money) -> bool {
        let low = Money::from_cents(170_00);
        let high = Money::from_cents(200_00);
        match self {
            Self::All => true,
            Self::Under170 => price < low,
            Self::From170To200 => price >= low && price <= high,
            Self::Over200 => price > high,
        }
    }
}

impl FromStr for PriceRange {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "under-170" => Ok(Self::Under170),
            "170-200" => Ok(Self::From170To200),
            "over-200" => Ok(Self::Over200),
            _ => Err(DomainError::InvalidValue {
                kind: "price range",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    Name,
    PriceLow,
    PriceHigh,
    /// Most reviewed first.
    Rating,
}

impl FromStr for SortBy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "name" => Ok(Self::Name),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "rating" => Ok(Self::Rating),
            _ => Err(DomainError::InvalidValue {
                kind: "sort order",
                value: s.to_string(),
            }),
        }
    }
}

/// Filters selected on the collection page. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub price: PriceRange,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub sort: SortBy,
}

impl CatalogQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if !product.is_visible_in_collection {
            return false;
        }
        let category_ok = self.category.is_none_or(|c| product.category == c);
        let size_ok = self.size.as_deref().is_none_or(|s| product.offers(s));
        category_ok && size_ok && self.price.contains(product.price)
    }

    /// Visible products matching the filters, in the requested order.
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut matching: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        matching.sort_by(|a, b| self.compare(a, b));
        matching
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self.sort {
            SortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortBy::PriceLow => a.price.cmp(&b.price),
            SortBy::PriceHigh => b.price.cmp(&a.price),
            SortBy::Rating => b.reviews.cmp(&a.reviews),
        }
    }
}

/// Visible products flagged for the home page.
pub fn featured(products: &[Product]) -> Vec<&Product> {
    products
        .iter()
        .filter(|p| p.is_visible_in_collection && p.is_featured)
        .collect()
}
