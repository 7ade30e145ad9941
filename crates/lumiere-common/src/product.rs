//! Fragrance records and the admin input that produces them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::money::Money;
use crate::pricing::{base_price, calculate_prices};
use crate::size::normalize_size_list;
use crate::stock::SizeStocks;

const IMAGE_URL_PREFIX: &str =
    "https://readdy.ai/api/search-image?query=luxury%20perfume%20bottle%20";
const IMAGE_URL_SUFFIX: &str = "%20scent%20premium%20packaging%20elegant%20design%20minimalist%20background%20sophisticated&width=300&height=400&orientation=portrait";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Floral,
    Fresh,
    Oriental,
    Gourmand,
    Woody,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Floral,
        Category::Fresh,
        Category::Oriental,
        Category::Gourmand,
        Category::Woody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Floral => "Floral",
            Self::Fresh => "Fresh",
            Self::Oriental => "Oriental",
            Self::Gourmand => "Gourmand",
            Self::Woody => "Woody",
        }
    }

    /// Placeholder artwork used when a product is saved without images.
    pub fn placeholder_image(&self) -> String {
        format!(
            "{}{}{}",
            IMAGE_URL_PREFIX,
            self.as_str().to_lowercase(),
            IMAGE_URL_SUFFIX
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::InvalidValue {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// Olfactory pyramid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notes {
    #[serde(default)]
    pub top: Vec<String>,
    #[serde(default)]
    pub heart: Vec<String>,
    #[serde(default)]
    pub base: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// Price of the smallest size, shown on listing cards.
    pub price: Money,
    #[serde(rename = "pricePer10Ml")]
    pub price_per_10ml: Money,
    pub calculated_prices: BTreeMap<String, Money>,
    pub size_stocks: SizeStocks,
    pub in_stock: bool,
    pub description: String,
    pub notes: Notes,
    pub reviews: u32,
    pub sizes: Vec<String>,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub is_visible_in_collection: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Thumbnail for list views and cart lines.
    pub fn image(&self) -> &str {
        self.images.first().map(String::as_str).unwrap_or_default()
    }

    pub fn offers(&self, size: &str) -> bool {
        self.sizes.iter().any(|s| s == size)
    }

    pub fn price_of(&self, size: &str) -> Option<Money> {
        self.calculated_prices.get(size).copied()
    }

    pub fn stock_of(&self, size: &str) -> u32 {
        self.size_stocks.get(size)
    }

    /// Add units to one of the sizes this product is sold in.
    pub fn restock(&mut self, size: &str, amount: u32, now: DateTime<Utc>) -> Result<u32, DomainError> {
        if !size.trim().is_empty() && !self.offers(size) {
            return Err(DomainError::UnknownSize {
                size: size.to_string(),
            });
        }
        let units = self.size_stocks.restock(size, amount)?;
        self.in_stock = self.size_stocks.in_stock();
        self.updated_at = now;
        Ok(units)
    }

    /// Recompute `in_stock` after the stock map changed.
    pub fn refresh_stock_flag(&mut self) {
        self.in_stock = self.size_stocks.in_stock();
    }

    /// The editable part of this product, for updates that re-derive prices.
    pub fn to_draft(&self) -> ProductDraft {
        ProductDraft {
            name: self.name.clone(),
            category: self.category,
            price_per_10ml: self.price_per_10ml,
            size_stocks: self.size_stocks.clone(),
            description: self.description.clone(),
            notes: self.notes.clone(),
            reviews: self.reviews,
            sizes: self.sizes.clone(),
            images: self.images.clone(),
            is_featured: self.is_featured,
            is_visible_in_collection: self.is_visible_in_collection,
        }
    }
}

fn default_sizes() -> Vec<String> {
    vec!["50ml".to_string(), "100ml".to_string()]
}

fn default_true() -> bool {
    true
}

/// Admin input for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub category: Category,
    #[serde(rename = "pricePer10Ml", default)]
    pub price_per_10ml: Money,
    #[serde(default)]
    pub size_stocks: SizeStocks,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: Notes,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default = "default_sizes")]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default = "default_true")]
    pub is_visible_in_collection: bool,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>, category: Category, price_per_10ml: Money) -> Self {
        Self {
            name: name.into(),
            category,
            price_per_10ml,
            size_stocks: SizeStocks::new(),
            description: String::new(),
            notes: Notes::default(),
            reviews: 0,
            sizes: default_sizes(),
            images: Vec::new(),
            is_featured: false,
            is_visible_in_collection: true,
        }
    }

    /// Derive every computed field and validate the result.
    ///
    /// `fallback_price` is used when no size carries a volume to price from
    /// (an existing product keeps its previous price in that case).
    pub fn into_product(
        self,
        id: String,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
        fallback_price: Option<Money>,
    ) -> Result<Product, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::MissingField { field: "name" });
        }

        let sizes = normalize_size_list(&self.sizes);
        let calculated_prices = calculate_prices(self.price_per_10ml, &sizes);
        let price = base_price(&sizes, &calculated_prices)
            .or(fallback_price)
            .unwrap_or(Money::ZERO);
        if !price.is_positive() {
            return Err(DomainError::NonPositivePrice);
        }

        // Stock is tracked for exactly the sizes on sale.
        let size_stocks: SizeStocks = sizes
            .iter()
            .map(|size| (size.clone(), self.size_stocks.get(size)))
            .collect();
        let in_stock = size_stocks.in_stock();

        let mut images = self.images;
        if images.iter().all(|url| url.trim().is_empty()) {
            images = vec![self.category.placeholder_image()];
        } else {
            images.retain(|url| !url.trim().is_empty());
        }

        Ok(Product {
            id,
            name,
            category: self.category,
            price,
            price_per_10ml: self.price_per_10ml,
            calculated_prices,
            size_stocks,
            in_stock,
            description: self.description,
            notes: self.notes,
            reviews: self.reviews,
            sizes,
            images,
            is_featured: self.is_featured,
            is_visible_in_collection: self.is_visible_in_collection,
            created_at,
            updated_at: now,
        })
    }
}

/// Partial product update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(rename = "pricePer10Ml", default, skip_serializing_if = "Option::is_none")]
    pub price_per_10ml: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_stocks: Option<SizeStocks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Notes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_visible_in_collection: Option<bool>,
}

impl ProductPatch {
    pub fn visibility(visible: bool) -> Self {
        Self {
            is_visible_in_collection: Some(visible),
            ..Self::default()
        }
    }

    /// Apply to `product`, re-deriving prices and stock flags.
    pub fn apply(self, product: &Product, now: DateTime<Utc>) -> Result<Product, DomainError> {
        let mut draft = product.to_draft();
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(category) = self.category {
            draft.category = category;
        }
        if let Some(rate) = self.price_per_10ml {
            draft.price_per_10ml = rate;
        }
        if let Some(stocks) = self.size_stocks {
            draft.size_stocks = stocks;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(notes) = self.notes {
            draft.notes = notes;
        }
        if let Some(reviews) = self.reviews {
            draft.reviews = reviews;
        }
        if let Some(sizes) = self.sizes {
            draft.sizes = sizes;
        }
        if let Some(images) = self.images {
            draft.images = images;
        }
        if let Some(featured) = self.is_featured {
            draft.is_featured = featured;
        }
        if let Some(visible) = self.is_visible_in_collection {
            draft.is_visible_in_collection = visible;
        }
        draft.into_product(product.id.clone(), product.created_at, now, Some(product.price))
    }
}
