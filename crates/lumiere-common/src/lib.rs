//! Domain model for the Lumiere perfume storefront.
//!
//! Nothing in this crate performs I/O. The `lumiere` service crate owns
//! storage, HTTP and outbound integrations, and calls into these types for
//! every pricing, stock and order rule.

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod product;
pub mod size;
pub mod stock;

pub use analytics::{summarize, DashboardSummary};
pub use cart::{
    reconcile, Cart, CartAction, CartAdjustment, CartItem, CartView, Reconciliation, RemovalReason,
};
pub use catalog::{featured, CatalogQuery, PriceRange, SortBy};
pub use checkout::{draft_order, quote, CheckoutForm, CheckoutRequest, QuoteRequest};
pub use error::DomainError;
pub use money::Money;
pub use order::{generate_order_number, Order, OrderEvent, OrderLine, OrderPatch, OrderStatus, StockMove};
pub use pricing::{PriceBreakdown, PricingPolicy};
pub use product::{Category, Notes, Product, ProductDraft, ProductPatch};
pub use stock::{SizeStocks, StockLevel, LOW_STOCK_THRESHOLD};
