//! Remote order fulfilment — `lumiere orders`.

use anyhow::Result;
use std::path::Path;

use lumiere_common::{Order, OrderPatch, OrderStatus};

use super::super::{OrdersCommands, RemoteArgs};
use super::remote::connect;

/// `None` for "all" or an empty filter.
fn parse_status_filter(value: Option<&str>) -> Result<Option<OrderStatus>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => Ok(Some(v.parse::<OrderStatus>()?)),
    }
}

fn fulfilment(order: &Order) -> &'static str {
    match (order.shipped, order.delivered) {
        (_, true) => "delivered",
        (true, false) => "shipped",
        _ => "-",
    }
}

fn print_orders(orders: &[Order]) {
    println!(
        "{:<22} {:<20} {:<28} {:>10} {:<10} {:<10} Date",
        "Order", "Customer", "Email", "Total", "Status", "Shipping"
    );
    for order in orders {
        println!(
            "{:<22} {:<20} {:<28} {:>10} {:<10} {:<10} {}",
            order.order_number,
            order.customer_name,
            order.email,
            order.total.to_string(),
            order.status.as_str(),
            fulfilment(order),
            order.date.format("%Y-%m-%d %H:%M")
        );
    }
    println!();
    println!("{} orders", orders.len());
}

fn print_order(order: &Order) {
    println!(
        "{} ({}) {} {}",
        order.order_number,
        order.id,
        order.status.as_str(),
        fulfilment(order)
    );
}

pub async fn cmd_orders(
    config_path: &Path,
    remote: &RemoteArgs,
    command: OrdersCommands,
) -> Result<()> {
    let client = connect(config_path, remote).await?;

    match command {
        OrdersCommands::List { status, search } => {
            let status = parse_status_filter(status.as_deref())?;
            let orders = client.list_orders(status, search.as_deref()).await?;
            print_orders(&orders);
        }
        OrdersCommands::Status { id, status } => {
            let status: OrderStatus = status.parse()?;
            let order = client.update_order(&id, &OrderPatch::status(status)).await?;
            print_order(&order);
        }
        OrdersCommands::Ship { id, undo } => {
            let order = client.update_order(&id, &OrderPatch::shipped(!undo)).await?;
            print_order(&order);
        }
        OrdersCommands::Deliver { id, undo } => {
            let order = client
                .update_order(&id, &OrderPatch::delivered(!undo))
                .await?;
            print_order(&order);
        }
    }

    Ok(())
}
