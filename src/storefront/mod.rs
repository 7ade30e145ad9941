//! Storefront service: the HTTP back end behind the Lumiere shop and its
//! admin back office.
//!
//! ## Module Map
//!
//! ```text
//! ┌───────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │ Shop / UI │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │  / Admin  │ <─────── │    └─ api.rs  (handlers, AppState, ApiError)     │
//! └───────────┘ WebSocket│         │            │             │            │
//!                        │         │ auth.rs    │ payment.rs  │ notify.rs  │
//!                        │         │ (tokens)   │ (Stripe)    │ (EmailJS)  │
//!                        │         v                                        │
//!                        │  db.rs  (StoreDb behind DbHandle, SQLite)        │
//!                        │         │                                        │
//!                        │         └─ ws.rs (StoreEvent broadcast)          │
//!                        └──────────────────────────────────────────────────┘
//! ```
//!
//! Pricing, cart, stock and order rules live in `lumiere_common`; this module
//! only stores, transports and announces their results.
//!
//! ## Supporting Modules
//!
//! | Module    | Responsibility                                            |
//! |-----------|-----------------------------------------------------------|
//! | `db`      | `products` / `orders` tables, transactional stock moves   |
//! | `ws`      | `StoreEvent` enum + `broadcast_message()` helper          |
//! | `payment` | `PaymentGateway` trait, `StripeGateway`                   |
//! | `notify`  | `Notifier` trait, deduplicating `NotificationDispatcher`  |
//! | `auth`    | Admin login and bearer-token check                        |
//! | `seed`    | The eight-fragrance launch catalog                        |
//!
//! ## Typical Request Flow (place an order)
//!
//! 1. `POST /api/orders` → `api::place_order()` validates the checkout form.
//! 2. The client cart is reconciled against live products and re-priced.
//! 3. When a gateway is configured the payment intent must have succeeded.
//! 4. `StoreDb::place_order()` inserts the order and reserves stock in one
//!    transaction.
//! 5. `OrderPlaced` and stock events go out over `/ws`; the customer gets a
//!    "pending" email in the background.

pub mod api;
pub mod auth;
pub mod db;
pub mod notify;
pub mod payment;
pub mod seed;
pub mod server;
pub mod ws;
