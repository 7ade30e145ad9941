//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                                  |
//! |------------|---------------------------------------------------|
//! | `serve`    | `Serve`                                           |
//! | `db`       | `InitDb`, `Seed`                                  |
//! | `config`   | `Config`                                          |
//! | `products` | `Products` (list, hide, show, restock, delete)    |
//! | `orders`   | `Orders` (list, status, ship, deliver)            |
//!
//! `products` and `orders` talk to a running server over REST through
//! `remote::connect()`.

pub mod config;
pub mod db;
pub mod orders;
pub mod products;
pub mod remote;
pub mod serve;

pub use config::cmd_config;
pub use db::{cmd_init_db, cmd_seed};
pub use orders::cmd_orders;
pub use products::cmd_products;
pub use serve::cmd_serve;
