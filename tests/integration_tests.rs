//! Integration tests for Lumiere
//!
//! The CLI tests drive the compiled binary; the storefront tests run the real
//! router on a local port and talk to it through `StoreClient`.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use lumiere::client::{ClientError, StoreClient};
use lumiere::config::LumiereToml;
use lumiere::storefront::api::AppState;
use lumiere::storefront::db::{DbHandle, StoreDb};
use lumiere::storefront::server::build_router;
use lumiere_common::{
    CartItem, Category, CheckoutForm, CheckoutRequest, Money, OrderPatch, OrderStatus,
    ProductDraft, QuoteRequest, SizeStocks,
};

/// Helper to create a lumiere Command with no ambient configuration
fn lumiere() -> Command {
    let mut cmd = cargo_bin_cmd!("lumiere");
    cmd.env_remove("PORT")
        .env_remove("LUMIERE_DB_PATH")
        .env_remove("RUST_LOG");
    cmd
}

// =============================================================================
// CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_lumiere_help() {
        lumiere()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("seed"));
    }

    #[test]
    fn test_lumiere_version() {
        lumiere().arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_command_fails() {
        lumiere().arg("frobnicate").assert().failure();
    }
}

mod config_commands {
    use super::*;

    #[test]
    fn test_config_init_creates_file() {
        let dir = TempDir::new().unwrap();

        lumiere()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created lumiere.toml"));

        let content = fs::read_to_string(dir.path().join("lumiere.toml")).unwrap();
        let parsed = LumiereToml::parse(&content).unwrap();
        assert_eq!(parsed, LumiereToml::default());
    }

    #[test]
    fn test_config_init_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lumiere.toml"), "[server]\nport = 9000\n").unwrap();

        lumiere()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        let content = fs::read_to_string(dir.path().join("lumiere.toml")).unwrap();
        assert!(content.contains("9000"));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("lumiere.toml"),
            "[store]\ntax_rate = 1.5\n",
        )
        .unwrap();

        lumiere()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Invalid tax_rate"));
    }

    #[test]
    fn test_config_show_uses_given_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[server]\nport = 6060\n").unwrap();

        lumiere()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 6060"));
    }

    #[test]
    fn test_config_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lumiere.toml"), "[server\nport = ").unwrap();

        lumiere()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .failure();
    }
}

mod database_commands {
    use super::*;

    #[test]
    fn test_init_db_creates_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("data").join("store.db");

        lumiere()
            .current_dir(dir.path())
            .args(["init-db", "--db-path"])
            .arg(&db_path)
            .assert()
            .success()
            .stdout(predicate::str::contains("products: 0"));

        assert!(db_path.exists());
    }

    #[test]
    fn test_seed_loads_catalog_once() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("store.db");

        lumiere()
            .current_dir(dir.path())
            .args(["seed", "--db-path"])
            .arg(&db_path)
            .assert()
            .success()
            .stdout(predicate::str::contains("Seeded 8 products"));

        lumiere()
            .current_dir(dir.path())
            .args(["seed", "--db-path"])
            .arg(&db_path)
            .assert()
            .success()
            .stdout(predicate::str::contains("skipping"));

        let db = StoreDb::new(&db_path).unwrap();
        assert_eq!(db.count_products().unwrap(), 8);
    }

    #[test]
    fn test_seed_force_adds_again() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("store.db");

        for args in [vec!["seed"], vec!["seed", "--force"]] {
            lumiere()
                .current_dir(dir.path())
                .args(&args)
                .arg("--db-path")
                .arg(&db_path)
                .assert()
                .success();
        }

        let db = StoreDb::new(&db_path).unwrap();
        assert_eq!(db.count_products().unwrap(), 16);
    }
}

mod remote_commands {
    use super::*;

    #[test]
    fn test_products_list_without_server_fails() {
        lumiere()
            .args(["products", "--url", "http://127.0.0.1:9", "--token", "t", "list"])
            .assert()
            .failure();
    }
}

// =============================================================================
// Storefront over HTTP
// =============================================================================

mod storefront_flow {
    use super::*;

    /// Serve a fresh in-memory store on an ephemeral port.
    async fn spawn_store() -> String {
        let db = StoreDb::new_in_memory().unwrap();
        let (ws_tx, _) = tokio::sync::broadcast::channel(64);
        let state = Arc::new(AppState::new(
            DbHandle::new(db),
            ws_tx,
            &LumiereToml::default(),
        ));
        let app = build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn admin(base: &str) -> StoreClient {
        let mut client = StoreClient::new(base);
        client.login("admin", "admin123").await.unwrap();
        client
    }

    fn rose_draft() -> ProductDraft {
        let mut draft = ProductDraft::new("Rose Noir", Category::Floral, Money::from_cents(24_00));
        draft.size_stocks = SizeStocks::from([("30ml", 5), ("50ml", 3), ("100ml", 2)]);
        draft
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            address: "12 Analytical Row".into(),
            city: "London".into(),
            zip_code: "N1 7GU".into(),
            country: "UK".into(),
        }
    }

    #[tokio::test]
    async fn test_health_and_public_catalog() {
        let base = spawn_store().await;
        let client = StoreClient::new(&base);

        assert_eq!(client.health().await.unwrap(), "ok");
        assert!(client.catalog(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_routes_require_login() {
        let base = spawn_store().await;
        let client = StoreClient::new(&base);

        let err = client.create_product(&rose_draft()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));

        let mut client = StoreClient::new(&base);
        let err = client.login("admin", "wrong").await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_checkout_to_fulfilment() {
        let base = spawn_store().await;
        let admin = admin(&base).await;

        let product = admin.create_product(&rose_draft()).await.unwrap();
        assert_eq!(product.price_of("50ml"), Some(Money::from_cents(120_00)));

        let shopper = StoreClient::new(&base);
        let line = CartItem::for_product(&product, "50ml", 2).unwrap();

        let quote = shopper
            .quote(&QuoteRequest {
                items: vec![line.clone()],
                promo_code: None,
            })
            .await
            .unwrap();
        assert_eq!(quote.subtotal, Money::from_cents(240_00));
        assert_eq!(quote.shipping, Money::ZERO);

        let order = shopper
            .place_order(&CheckoutRequest {
                form: form(),
                items: vec![line],
                promo_code: None,
                payment_intent_id: None,
            })
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, quote.total);
        assert!(order.order_number.starts_with("#LUM"));

        let after = admin.get_product(&product.id).await.unwrap();
        assert_eq!(after.stock_of("50ml"), 1);

        let confirmed = admin
            .update_order(&order.id, &OrderPatch::status(OrderStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(confirmed.status, OrderStatus::Confirmed);

        let shipped = admin
            .update_order(&order.id, &OrderPatch::shipped(true))
            .await
            .unwrap();
        assert!(shipped.shipped);

        let listed = admin
            .list_orders(Some(OrderStatus::Confirmed), Some("lovelace"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let dashboard = admin.dashboard().await.unwrap();
        assert_eq!(dashboard.total_orders, 1);
        assert_eq!(dashboard.total_revenue, order.total);
        assert_eq!(dashboard.confirmed_orders, 1);
    }

    #[tokio::test]
    async fn test_order_exceeding_stock_conflicts() {
        let base = spawn_store().await;
        let admin = admin(&base).await;
        let product = admin.create_product(&rose_draft()).await.unwrap();

        let mut line = CartItem::for_product(&product, "100ml", 1).unwrap();
        line.quantity = 5;

        let err = StoreClient::new(&base)
            .place_order(&CheckoutRequest {
                form: form(),
                items: vec![line],
                promo_code: None,
                payment_intent_id: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));

        let untouched = admin.get_product(&product.id).await.unwrap();
        assert_eq!(untouched.stock_of("100ml"), 2);
        assert!(admin.list_orders(None, None).await.unwrap().is_empty());
    }
}
