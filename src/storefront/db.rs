use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lumiere_common::{
    Category, DomainError, Money, Order, OrderEvent, OrderPatch, OrderStatus, Product,
    ProductDraft, ProductPatch, StockMove,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use crate::errors::StoreError;

/// The store database as shared by request handlers. One handler at a time
/// holds the connection, on the blocking pool.
#[derive(Clone)]
pub struct DbHandle(Arc<Mutex<StoreDb>>);

impl DbHandle {
    pub fn new(db: StoreDb) -> Self {
        Self(Arc::new(Mutex::new(db)))
    }

    /// Run one catalog or order operation. `work` owns everything it touches.
    pub async fn call<F, R>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&StoreDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(&self.0);
        let outcome = tokio::task::spawn_blocking(move || {
            let db = store
                .lock()
                .map_err(|_| anyhow::anyhow!("Store database unusable after a panicked query"))?;
            work(&db)
        })
        .await;
        outcome.context("Store database query panicked")?
    }
}

/// Filters for the admin order list.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Free-text match on order number, customer name or email.
    pub query: Option<String>,
}

/// Result of an admin order update.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub order: Order,
    pub events: Vec<OrderEvent>,
    /// Products whose stock moved because of the change.
    pub restocked: Vec<Product>,
}

pub struct StoreDb {
    conn: Connection,
}

impl StoreDb {
    /// Open (or create) a SQLite database at `path` and create the schema.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA journal_mode = WAL;")
            .context("Failed to set journal mode")?;
        self.create_schema().context("Failed to create schema")?;
        Ok(())
    }

    fn create_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS products (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    price_cents INTEGER NOT NULL,
                    price_per_10ml_cents INTEGER NOT NULL,
                    calculated_prices TEXT NOT NULL DEFAULT '{}',
                    size_stocks TEXT NOT NULL DEFAULT '{}',
                    in_stock INTEGER NOT NULL DEFAULT 0,
                    description TEXT NOT NULL DEFAULT '',
                    notes TEXT NOT NULL DEFAULT '{}',
                    reviews INTEGER NOT NULL DEFAULT 0,
                    sizes TEXT NOT NULL DEFAULT '[]',
                    images TEXT NOT NULL DEFAULT '[]',
                    is_featured INTEGER NOT NULL DEFAULT 0,
                    is_visible INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS orders (
                    id TEXT PRIMARY KEY,
                    order_number TEXT NOT NULL UNIQUE,
                    customer_name TEXT NOT NULL,
                    email TEXT NOT NULL,
                    items TEXT NOT NULL DEFAULT '[]',
                    subtotal_cents INTEGER NOT NULL,
                    tax_cents INTEGER NOT NULL,
                    shipping_cents INTEGER NOT NULL,
                    discount_cents INTEGER NOT NULL DEFAULT 0,
                    total_cents INTEGER NOT NULL,
                    item_count INTEGER NOT NULL,
                    promo_code TEXT,
                    status TEXT NOT NULL DEFAULT 'pending',
                    date TEXT NOT NULL,
                    shipping_address TEXT NOT NULL,
                    shipped INTEGER NOT NULL DEFAULT 0,
                    delivered INTEGER NOT NULL DEFAULT 0,
                    payment_intent_id TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);
                CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
                CREATE INDEX IF NOT EXISTS idx_orders_date ON orders(date);
                CREATE INDEX IF NOT EXISTS idx_orders_email ON orders(email);
                CREATE UNIQUE INDEX IF NOT EXISTS idx_orders_payment_intent
                    ON orders(payment_intent_id) WHERE payment_intent_id IS NOT NULL;
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Products ──────────────────────────────────────────────────────

    pub fn list_products(&self) -> Result<Vec<Product>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY name COLLATE NOCASE", SELECT_PRODUCT))
            .context("Failed to prepare list_products")?;
        let rows = stmt
            .query_map([], ProductRow::from_row)
            .context("Failed to query products")?;
        let mut products = Vec::new();
        for row in rows {
            let r = row.context("Failed to read product row")?;
            products.push(r.into_product()?);
        }
        Ok(products)
    }

    pub fn get_product(&self, id: &str) -> Result<Option<Product>> {
        load_product(&self.conn, id)
    }

    pub fn count_products(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
            .context("Failed to count products")?;
        Ok(count as usize)
    }

    pub fn create_product(&self, draft: ProductDraft, now: DateTime<Utc>) -> Result<Product> {
        let product = draft.into_product(Uuid::new_v4().to_string(), now, now, None)?;
        save_product(&self.conn, &product)?;
        Ok(product)
    }

    /// Replace every editable field of a product, keeping its id and creation time.
    pub fn replace_product(
        &self,
        id: &str,
        draft: ProductDraft,
        now: DateTime<Utc>,
    ) -> Result<Product> {
        let existing = self.require_product(id)?;
        let product =
            draft.into_product(existing.id, existing.created_at, now, Some(existing.price))?;
        save_product(&self.conn, &product)?;
        Ok(product)
    }

    pub fn patch_product(
        &self,
        id: &str,
        patch: ProductPatch,
        now: DateTime<Utc>,
    ) -> Result<Product> {
        let existing = self.require_product(id)?;
        let product = patch.apply(&existing, now)?;
        save_product(&self.conn, &product)?;
        Ok(product)
    }

    pub fn restock_product(
        &self,
        id: &str,
        size: &str,
        amount: u32,
        now: DateTime<Utc>,
    ) -> Result<Product> {
        let mut product = self.require_product(id)?;
        product.restock(size, amount, now)?;
        save_product(&self.conn, &product)?;
        Ok(product)
    }

    pub fn delete_product(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM products WHERE id = ?1", params![id])
            .context("Failed to delete product")?;
        Ok(affected > 0)
    }

    /// Insert a batch of products in one transaction.
    pub fn seed_products(&self, drafts: Vec<ProductDraft>, now: DateTime<Utc>) -> Result<Vec<Product>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin seed transaction")?;
        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let product = draft.into_product(Uuid::new_v4().to_string(), now, now, None)?;
            save_product(&tx, &product)?;
            created.push(product);
        }
        tx.commit().context("Failed to commit seed transaction")?;
        Ok(created)
    }

    fn require_product(&self, id: &str) -> Result<Product> {
        load_product(&self.conn, id)?.ok_or_else(|| {
            StoreError::ProductNotFound { id: id.to_string() }.into()
        })
    }

    // ── Orders ────────────────────────────────────────────────────────

    /// Orders, newest first.
    pub fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let status = filter.status.map(|s| s.as_str().to_string());
        let mut stmt = self
            .conn
            .prepare(&format!(
                "{} WHERE (?1 IS NULL OR status = ?1) ORDER BY date DESC",
                SELECT_ORDER
            ))
            .context("Failed to prepare list_orders")?;
        let rows = stmt
            .query_map(params![status], OrderRow::from_row)
            .context("Failed to query orders")?;
        let mut orders = Vec::new();
        for row in rows {
            let order = row.context("Failed to read order row")?.into_order()?;
            if filter
                .query
                .as_deref()
                .is_none_or(|q| order.matches_search(q))
            {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    pub fn get_order(&self, id: &str) -> Result<Option<Order>> {
        load_order(&self.conn, id)
    }

    /// Store a new order and take its units out of stock, atomically.
    ///
    /// A payment intent pays for one order only. Returns the products whose
    /// stock changed.
    pub fn place_order(&self, order: &Order, now: DateTime<Utc>) -> Result<Vec<Product>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin order transaction")?;
        if let Some(intent) = &order.payment_intent_id {
            if let Some(existing) = order_number_for_intent(&tx, intent)? {
                return Err(StoreError::PaymentReused {
                    intent: intent.clone(),
                    order_number: existing,
                }
                .into());
            }
        }
        let touched = if order.status == OrderStatus::Cancelled {
            Vec::new()
        } else {
            move_stock(&tx, order, StockMove::Reserve, now)?
        };
        insert_order(&tx, order)?;
        tx.commit().context("Failed to commit order transaction")?;
        Ok(touched)
    }

    /// Apply an admin change, moving stock when the order enters or leaves
    /// the cancelled state.
    pub fn update_order(
        &self,
        id: &str,
        patch: OrderPatch,
        now: DateTime<Utc>,
    ) -> Result<OrderUpdate> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin order update")?;
        let mut order = load_order(&tx, id)?
            .ok_or_else(|| StoreError::OrderNotFound { id: id.to_string() })?;
        let before = order.status;
        let events = order.apply_patch(patch)?;
        let restocked = match StockMove::between(before, order.status) {
            Some(direction) => move_stock(&tx, &order, direction, now)?,
            None => Vec::new(),
        };
        tx.execute(
            "UPDATE orders SET status = ?1, shipped = ?2, delivered = ?3 WHERE id = ?4",
            params![order.status.as_str(), order.shipped, order.delivered, order.id],
        )
        .context("Failed to update order")?;
        tx.commit().context("Failed to commit order update")?;
        Ok(OrderUpdate {
            order,
            events,
            restocked,
        })
    }

    pub fn delete_order(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM orders WHERE id = ?1", params![id])
            .context("Failed to delete order")?;
        Ok(affected > 0)
    }
}

// ── Row mapping ───────────────────────────────────────────────────────

const SELECT_PRODUCT: &str = "SELECT id, name, category, price_cents, price_per_10ml_cents, \
     calculated_prices, size_stocks, in_stock, description, notes, reviews, sizes, images, \
     is_featured, is_visible, created_at, updated_at FROM products";

const SELECT_ORDER: &str = "SELECT id, order_number, customer_name, email, items, \
     subtotal_cents, tax_cents, shipping_cents, discount_cents, total_cents, item_count, \
     promo_code, status, date, shipping_address, shipped, delivered, payment_intent_id \
     FROM orders";

fn parse_timestamp(value: &str, what: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Failed to parse {} timestamp '{}'", what, value))
}

fn load_product(conn: &Connection, id: &str) -> Result<Option<Product>> {
    let row = conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_PRODUCT),
            params![id],
            ProductRow::from_row,
        )
        .optional()
        .context("Failed to query product")?;
    row.map(ProductRow::into_product).transpose()
}

fn save_product(conn: &Connection, product: &Product) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO products (id, name, category, price_cents, price_per_10ml_cents,
             calculated_prices, size_stocks, in_stock, description, notes, reviews, sizes, images,
             is_featured, is_visible, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            product.id,
            product.name,
            product.category.as_str(),
            product.price.cents(),
            product.price_per_10ml.cents(),
            serde_json::to_string(&product.calculated_prices)?,
            serde_json::to_string(&product.size_stocks)?,
            product.in_stock,
            product.description,
            serde_json::to_string(&product.notes)?,
            product.reviews,
            serde_json::to_string(&product.sizes)?,
            serde_json::to_string(&product.images)?,
            product.is_featured,
            product.is_visible_in_collection,
            product.created_at.to_rfc3339(),
            product.updated_at.to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to save product {}", product.id))?;
    Ok(())
}

fn load_order(conn: &Connection, id: &str) -> Result<Option<Order>> {
    let row = conn
        .query_row(
            &format!("{} WHERE id = ?1", SELECT_ORDER),
            params![id],
            OrderRow::from_row,
        )
        .optional()
        .context("Failed to query order")?;
    row.map(OrderRow::into_order).transpose()
}

fn order_number_for_intent(conn: &Connection, intent: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT order_number FROM orders WHERE payment_intent_id = ?1",
        params![intent],
        |row| row.get(0),
    )
    .optional()
    .context("Failed to look up payment intent")
}

fn insert_order(conn: &Connection, order: &Order) -> Result<()> {
    conn.execute(
        "INSERT INTO orders (id, order_number, customer_name, email, items, subtotal_cents,
             tax_cents, shipping_cents, discount_cents, total_cents, item_count, promo_code,
             status, date, shipping_address, shipped, delivered, payment_intent_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            order.id,
            order.order_number,
            order.customer_name,
            order.email,
            serde_json::to_string(&order.items)?,
            order.subtotal.cents(),
            order.tax.cents(),
            order.shipping.cents(),
            order.discount_amount.cents(),
            order.total.cents(),
            order.item_count,
            order.promo_code,
            order.status.as_str(),
            order.date.to_rfc3339(),
            order.shipping_address,
            order.shipped,
            order.delivered,
            order.payment_intent_id,
        ],
    )
    .with_context(|| format!("Failed to insert order {}", order.order_number))?;
    Ok(())
}

/// Reserve or release every line of `order`. Reservation fails as a whole
/// when any size is short. Release skips products that no longer exist and
/// sizes they no longer sell.
fn move_stock(
    conn: &Connection,
    order: &Order,
    direction: StockMove,
    now: DateTime<Utc>,
) -> Result<Vec<Product>> {
    let mut touched: Vec<Product> = Vec::new();
    for ((product_id, size), quantity) in order.stock_requirements() {
        let Some(mut product) = load_product(conn, &product_id)? else {
            match direction {
                StockMove::Reserve => {
                    return Err(StoreError::ProductNotFound { id: product_id }.into());
                }
                StockMove::Release => {
                    tracing::warn!(
                        order = %order.order_number,
                        product_id = %product_id,
                        "Product no longer exists; stock not returned"
                    );
                    continue;
                }
            }
        };
        match direction {
            StockMove::Reserve => {
                product.size_stocks.reserve(&size, quantity)?;
            }
            StockMove::Release => {
                if !product.offers(&size) {
                    tracing::warn!(
                        order = %order.order_number,
                        product_id = %product_id,
                        size = %size,
                        "Size no longer sold; stock not returned"
                    );
                    continue;
                }
                product.size_stocks.release(&size, quantity);
            }
        }
        product.refresh_stock_flag();
        product.updated_at = now;
        save_product(conn, &product)?;

        touched.retain(|p| p.id != product.id);
        touched.push(product);
    }
    Ok(touched)
}

/// Raw `products` row before JSON columns are decoded.
struct ProductRow {
    id: String,
    name: String,
    category: String,
    price_cents: i64,
    price_per_10ml_cents: i64,
    calculated_prices: String,
    size_stocks: String,
    in_stock: bool,
    description: String,
    notes: String,
    reviews: u32,
    sizes: String,
    images: String,
    is_featured: bool,
    is_visible: bool,
    created_at: String,
    updated_at: String,
}

impl ProductRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            price_cents: row.get(3)?,
            price_per_10ml_cents: row.get(4)?,
            calculated_prices: row.get(5)?,
            size_stocks: row.get(6)?,
            in_stock: row.get(7)?,
            description: row.get(8)?,
            notes: row.get(9)?,
            reviews: row.get(10)?,
            sizes: row.get(11)?,
            images: row.get(12)?,
            is_featured: row.get(13)?,
            is_visible: row.get(14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }

    fn into_product(self) -> Result<Product> {
        let category: Category = self
            .category
            .parse()
            .map_err(|e: DomainError| anyhow::anyhow!(e))
            .context("Failed to parse product category")?;
        Ok(Product {
            category,
            price: Money::from_cents(self.price_cents),
            price_per_10ml: Money::from_cents(self.price_per_10ml_cents),
            calculated_prices: serde_json::from_str(&self.calculated_prices)
                .context("Failed to parse calculated_prices JSON")?,
            size_stocks: serde_json::from_str(&self.size_stocks)
                .context("Failed to parse size_stocks JSON")?,
            in_stock: self.in_stock,
            notes: serde_json::from_str(&self.notes).context("Failed to parse notes JSON")?,
            sizes: serde_json::from_str(&self.sizes).context("Failed to parse sizes JSON")?,
            images: serde_json::from_str(&self.images).context("Failed to parse images JSON")?,
            created_at: parse_timestamp(&self.created_at, "product created_at")?,
            updated_at: parse_timestamp(&self.updated_at, "product updated_at")?,
            id: self.id,
            name: self.name,
            description: self.description,
            reviews: self.reviews,
            is_featured: self.is_featured,
            is_visible_in_collection: self.is_visible,
        })
    }
}

/// Raw `orders` row before JSON columns are decoded.
struct OrderRow {
    id: String,
    order_number: String,
    customer_name: String,
    email: String,
    items: String,
    subtotal_cents: i64,
    tax_cents: i64,
    shipping_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    item_count: u32,
    promo_code: Option<String>,
    status: String,
    date: String,
    shipping_address: String,
    shipped: bool,
    delivered: bool,
    payment_intent_id: Option<String>,
}

impl OrderRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            order_number: row.get(1)?,
            customer_name: row.get(2)?,
            email: row.get(3)?,
            items: row.get(4)?,
            subtotal_cents: row.get(5)?,
            tax_cents: row.get(6)?,
            shipping_cents: row.get(7)?,
            discount_cents: row.get(8)?,
            total_cents: row.get(9)?,
            item_count: row.get(10)?,
            promo_code: row.get(11)?,
            status: row.get(12)?,
            date: row.get(13)?,
            shipping_address: row.get(14)?,
            shipped: row.get(15)?,
            delivered: row.get(16)?,
            payment_intent_id: row.get(17)?,
        })
    }

    fn into_order(self) -> Result<Order> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e: DomainError| anyhow::anyhow!(e))
            .context("Failed to parse order status")?;
        Ok(Order {
            items: serde_json::from_str(&self.items).context("Failed to parse order items JSON")?,
            subtotal: Money::from_cents(self.subtotal_cents),
            tax: Money::from_cents(self.tax_cents),
            shipping: Money::from_cents(self.shipping_cents),
            discount_amount: Money::from_cents(self.discount_cents),
            total: Money::from_cents(self.total_cents),
            status,
            date: parse_timestamp(&self.date, "order date")?,
            id: self.id,
            order_number: self.order_number,
            customer_name: self.customer_name,
            email: self.email,
            item_count: self.item_count,
            promo_code: self.promo_code,
            shipping_address: self.shipping_address,
            shipped: self.shipped,
            delivered: self.delivered,
            payment_intent_id: self.payment_intent_id,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
