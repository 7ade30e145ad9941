//! Remote product management — `lumiere products`.

use anyhow::Result;
use std::path::Path;

use lumiere_common::{Product, ProductPatch, StockLevel};

use super::super::{ProductsCommands, RemoteArgs};
use super::remote::connect;

fn stock_summary(product: &Product) -> String {
    product
        .sizes
        .iter()
        .map(|size| format!("{}:{}", size, product.stock_of(size)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn level_label(level: StockLevel) -> &'static str {
    match level {
        StockLevel::InStock => "ok",
        StockLevel::Low => "LOW",
        StockLevel::OutOfStock => "OUT",
    }
}

fn print_products(products: &[Product], threshold: u32) {
    println!(
        "{:<36} {:<24} {:<10} {:>9} {:<5} {:<7} Stock",
        "ID", "Name", "Category", "From", "Level", "Visible"
    );
    for product in products {
        println!(
            "{:<36} {:<24} {:<10} {:>9} {:<5} {:<7} {}",
            product.id,
            product.name,
            product.category.as_str(),
            product.price.to_string(),
            level_label(product.size_stocks.level(threshold)),
            if product.is_visible_in_collection {
                "yes"
            } else {
                "no"
            },
            stock_summary(product)
        );
    }
    println!();
    println!("{} products", products.len());
}

pub async fn cmd_products(
    config_path: &Path,
    remote: &RemoteArgs,
    command: ProductsCommands,
) -> Result<()> {
    let client = connect(config_path, remote).await?;

    match command {
        ProductsCommands::List => {
            let threshold = lumiere::config::LumiereToml::load_or_default(config_path)?
                .store
                .low_stock_threshold;
            let products = client.list_products().await?;
            print_products(&products, threshold);
        }
        ProductsCommands::Hide { id } => {
            let patch = ProductPatch {
                is_visible_in_collection: Some(false),
                ..Default::default()
            };
            let product = client.patch_product(&id, &patch).await?;
            println!("Hidden from collection: {}", product.name);
        }
        ProductsCommands::Show { id } => {
            let patch = ProductPatch {
                is_visible_in_collection: Some(true),
                ..Default::default()
            };
            let product = client.patch_product(&id, &patch).await?;
            println!("Visible in collection: {}", product.name);
        }
        ProductsCommands::Restock { id, size, amount } => {
            let product = client.restock(&id, &size, amount).await?;
            println!(
                "Restocked {} {}: now {} units",
                product.name,
                size,
                product.stock_of(&size)
            );
        }
        ProductsCommands::Delete { id } => {
            client.delete_product(&id).await?;
            println!("Deleted product {}", id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumiere_common::{Category, Money, Notes, SizeStocks};

    #[test]
    fn test_stock_summary_follows_size_order() {
        let now = chrono::Utc::now();
        let product = Product {
            id: "p1".into(),
            name: "Rose Noir".into(),
            category: Category::Floral,
            price: Money::from_cents(72_00),
            price_per_10ml: Money::from_cents(24_00),
            calculated_prices: Default::default(),
            size_stocks: SizeStocks::from([("30ml", 4), ("50ml", 0), ("100ml", 12)]),
            in_stock: true,
            description: String::new(),
            notes: Notes::default(),
            reviews: 0,
            sizes: vec!["30ml".into(), "50ml".into(), "100ml".into()],
            images: Vec::new(),
            is_featured: false,
            is_visible_in_collection: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(stock_summary(&product), "30ml:4 50ml:0 100ml:12");
    }

    #[test]
    fn test_level_labels() {
        assert_eq!(level_label(StockLevel::Low), "LOW");
        assert_eq!(level_label(StockLevel::OutOfStock), "OUT");
    }
}
