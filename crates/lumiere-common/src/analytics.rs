//! Back-office dashboard figures.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::order::{Order, OrderLine, OrderStatus};
use crate::product::{Category, Product};
use crate::stock::{SizeStocks, StockLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub category: Category,
    pub units_sold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: Category,
    pub units_sold: u32,
    /// Percentage of all units sold, 0 when nothing has sold.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub product_id: String,
    pub name: String,
    pub level: StockLevel,
    pub size_stocks: SizeStocks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    /// Name on the customer's most recent order.
    pub name: String,
    pub email: String,
    pub order_count: usize,
    pub total_spent: Money,
    pub last_order_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_revenue: Money,
    pub total_orders: usize,
    pub total_products: usize,
    pub pending_orders: usize,
    pub confirmed_orders: usize,
    pub cancelled_orders: usize,
    pub orders_this_month: usize,
    pub new_customers_this_month: usize,
    /// Every product, best seller first.
    pub product_sales: Vec<ProductSales>,
    pub category_shares: Vec<CategoryShare>,
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: Vec<StockAlert>,
    /// Most recent customer first.
    pub customers: Vec<CustomerSummary>,
}

fn same_month(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Lines from before `product_id` was recorded carry it only as the prefix of
/// their `<product>-<size>` id.
fn line_belongs_to(line: &OrderLine, product_id: &str) -> bool {
    if line.product_id.is_empty() {
        line.id
            .strip_prefix(product_id)
            .is_some_and(|rest| rest.starts_with('-'))
    } else {
        line.product_id == product_id
    }
}

fn units_sold(product: &Product, orders: &[Order]) -> u32 {
    orders
        .iter()
        .flat_map(|order| order.items.iter())
        .filter(|line| line_belongs_to(line, &product.id))
        .fold(0u32, |units, line| units.saturating_add(line.quantity))
}

fn stock_alert(product: &Product, level: StockLevel) -> StockAlert {
    StockAlert {
        product_id: product.id.clone(),
        name: product.name.clone(),
        level,
        size_stocks: product.size_stocks.clone(),
    }
}

fn customer_rollup(orders: &[Order]) -> Vec<CustomerSummary> {
    let mut by_email: HashMap<&str, CustomerSummary> = HashMap::new();
    for order in orders {
        let entry = by_email
            .entry(order.email.as_str())
            .or_insert_with(|| CustomerSummary {
                name: order.customer_name.clone(),
                email: order.email.clone(),
                order_count: 0,
                total_spent: Money::ZERO,
                last_order_date: order.date,
            });
        entry.order_count += 1;
        entry.total_spent += order.total;
        if order.date >= entry.last_order_date {
            entry.last_order_date = order.date;
            entry.name = order.customer_name.clone();
        }
    }
    let mut customers: Vec<CustomerSummary> = by_email.into_values().collect();
    customers.sort_by(|a, b| {
        b.last_order_date
            .cmp(&a.last_order_date)
            .then_with(|| a.email.cmp(&b.email))
    });
    customers
}

/// Dashboard figures for `now`'s calendar month.
pub fn summarize(
    products: &[Product],
    orders: &[Order],
    now: DateTime<Utc>,
    low_stock_threshold: u32,
) -> DashboardSummary {
    let count_status = |status: OrderStatus| orders.iter().filter(|o| o.status == status).count();

    let orders_this_month = orders.iter().filter(|o| same_month(o.date, now)).count();

    let mut first_order: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for order in orders {
        first_order
            .entry(order.email.as_str())
            .and_modify(|first| *first = (*first).min(order.date))
            .or_insert(order.date);
    }
    let new_customers_this_month = first_order
        .values()
        .filter(|first| same_month(**first, now))
        .count();

    let mut product_sales: Vec<ProductSales> = products
        .iter()
        .map(|p| ProductSales {
            product_id: p.id.clone(),
            name: p.name.clone(),
            category: p.category,
            units_sold: units_sold(p, orders),
        })
        .collect();
    product_sales.sort_by(|a, b| b.units_sold.cmp(&a.units_sold));

    let total_units = product_sales
        .iter()
        .fold(0u32, |units, s| units.saturating_add(s.units_sold));
    let mut per_category: BTreeMap<&str, u32> = BTreeMap::new();
    for sale in &product_sales {
        let units = per_category.entry(sale.category.as_str()).or_insert(0);
        *units = units.saturating_add(sale.units_sold);
    }
    let category_shares = Category::ALL
        .into_iter()
        .map(|category| {
            let units = per_category.get(category.as_str()).copied().unwrap_or(0);
            let percentage = if total_units > 0 {
                f64::from(units) / f64::from(total_units) * 100.0
            } else {
                0.0
            };
            CategoryShare {
                category,
                units_sold: units,
                percentage,
            }
        })
        .collect();

    let mut low_stock = Vec::new();
    let mut out_of_stock = Vec::new();
    for product in products {
        match product.size_stocks.level(low_stock_threshold) {
            StockLevel::Low => low_stock.push(stock_alert(product, StockLevel::Low)),
            StockLevel::OutOfStock => out_of_stock.push(stock_alert(product, StockLevel::OutOfStock)),
            StockLevel::InStock => {}
        }
    }

    DashboardSummary {
        total_revenue: orders.iter().map(|o| o.total).sum(),
        total_orders: orders.len(),
        total_products: products.len(),
        pending_orders: count_status(OrderStatus::Pending),
        confirmed_orders: count_status(OrderStatus::Confirmed),
        cancelled_orders: count_status(OrderStatus::Cancelled),
        orders_this_month,
        new_customers_this_month,
        product_sales,
        category_shares,
        low_stock,
        out_of_stock,
        customers: customer_rollup(orders),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductDraft;

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    fn product(id: &str, name: &str, category: Category, stocks: SizeStocks) -> Product {
        let mut draft = ProductDraft::new(name, category, Money::from_dollars(10.0));
        draft.sizes = vec!["30ml".into(), "50ml".into()];
        draft.size_stocks = stocks;
        draft
            .into_product(id.into(), at("2025-01-01T00:00:00Z"), at("2025-01-01T00:00:00Z"), None)
            .unwrap()
    }

    fn order(email: &str, name: &str, date: &str, total: f64, lines: &[(&str, u32)]) -> Order {
        Order {
            id: format!("{}-{}", email, date),
            order_number: format!("#LUM-{}", date),
            customer_name: name.into(),
            email: email.into(),
            items: lines
                .iter()
                .map(|(product_id, quantity)| OrderLine {
                    id: format!("{}-50ml", product_id),
                    product_id: product_id.to_string(),
                    name: String::new(),
                    quantity: *quantity,
                    price: Money::from_dollars(50.0),
                    size: "50ml".into(),
                })
                .collect(),
            subtotal: Money::from_dollars(total),
            tax: Money::ZERO,
            shipping: Money::ZERO,
            discount_amount: Money::ZERO,
            total: Money::from_dollars(total),
            item_count: lines.iter().map(|(_, q)| q).sum(),
            promo_code: None,
            status: OrderStatus::Pending,
            date: at(date),
            shipping_address: String::new(),
            shipped: false,
            delivered: false,
            payment_intent_id: None,
        }
    }

    fn fixture() -> (Vec<Product>, Vec<Order>) {
        let products = vec![
            product("p1", "Midnight Rose", Category::Floral, SizeStocks::from([("30ml", 20), ("50ml", 45)])),
            product("p2", "Ocean Breeze", Category::Fresh, SizeStocks::from([("30ml", 3), ("50ml", 40)])),
            product("p3", "Amber Nights", Category::Oriental, SizeStocks::from([("30ml", 0), ("50ml", 0)])),
        ];
        let mut cancelled = order("bob@example.com", "Bob", "2025-06-03T09:00:00Z", 50.0, &[("p1", 1)]);
        cancelled.status = OrderStatus::Cancelled;
        let orders = vec![
            order("ann@example.com", "Ann", "2025-05-20T09:00:00Z", 100.0, &[("p2", 2)]),
            order("ann@example.com", "Ann Smith", "2025-06-02T09:00:00Z", 150.0, &[("p2", 3)]),
            cancelled,
        ];
        (products, orders)
    }

    #[test]
    fn counts_revenue_and_statuses() {
        let (products, orders) = fixture();
        let s = summarize(&products, &orders, at("2025-06-15T00:00:00Z"), 10);
        assert_eq!(s.total_revenue, Money::from_dollars(300.0));
        assert_eq!(s.total_orders, 3);
        assert_eq!(s.total_products, 3);
        assert_eq!(s.pending_orders, 2);
        assert_eq!(s.cancelled_orders, 1);
        assert_eq!(s.orders_this_month, 2);
    }

    #[test]
    fn new_customers_are_first_time_buyers_this_month() {
        let (products, orders) = fixture();
        let s = summarize(&products, &orders, at("2025-06-15T00:00:00Z"), 10);
        // ann first ordered in May
        assert_eq!(s.new_customers_this_month, 1);
    }

    #[test]
    fn ranks_products_by_units_sold() {
        let (products, orders) = fixture();
        let s = summarize(&products, &orders, at("2025-06-15T00:00:00Z"), 10);
        assert_eq!(s.product_sales[0].product_id, "p2");
        assert_eq!(s.product_sales[0].units_sold, 5);
        let fresh = s
            .category_shares
            .iter()
            .find(|c| c.category == Category::Fresh)
            .unwrap();
        assert!((fresh.percentage - 5.0 / 6.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn separates_low_and_out_of_stock() {
        let (products, orders) = fixture();
        let s = summarize(&products, &orders, at("2025-06-15T00:00:00Z"), 10);
        assert_eq!(s.low_stock.len(), 1);
        assert_eq!(s.low_stock[0].product_id, "p2");
        assert_eq!(s.out_of_stock.len(), 1);
        assert_eq!(s.out_of_stock[0].product_id, "p3");
    }

    #[test]
    fn customer_rollup_uses_latest_name() {
        let (products, orders) = fixture();
        let s = summarize(&products, &orders, at("2025-06-15T00:00:00Z"), 10);
        let ann = s.customers.iter().find(|c| c.email == "ann@example.com").unwrap();
        assert_eq!(ann.name, "Ann Smith");
        assert_eq!(ann.order_count, 2);
        assert_eq!(ann.total_spent, Money::from_dollars(250.0));
        assert_eq!(s.customers[0].email, "bob@example.com");
    }

    #[test]
    fn legacy_lines_match_whole_product_id() {
        let p1 = product("p1", "Midnight Rose", Category::Floral, SizeStocks::from([("50ml", 5)]));
        let p10 = product("p10", "Vetiver Dusk", Category::Woody, SizeStocks::from([("50ml", 5)]));
        let mut legacy = order("cy@example.com", "Cy", "2025-06-05T09:00:00Z", 50.0, &[("p10", 4), ("p1", 1)]);
        for line in &mut legacy.items {
            line.product_id.clear();
        }
        let orders = vec![legacy];

        assert_eq!(units_sold(&p1, &orders), 1);
        assert_eq!(units_sold(&p10, &orders), 4);
    }
}
