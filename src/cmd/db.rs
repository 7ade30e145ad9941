//! Database bootstrap commands — `lumiere init-db` and `lumiere seed`.

use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};

use lumiere::config::LumiereToml;
use lumiere::storefront::seed::default_catalog;
use lumiere::storefront::server::open_database;

fn resolve_db_path(config_path: &Path, db_path: Option<PathBuf>) -> Result<PathBuf> {
    match db_path {
        Some(path) => Ok(path),
        None => Ok(LumiereToml::load_or_default(config_path)?
            .with_env_overrides()
            .server
            .db_path),
    }
}

pub fn cmd_init_db(config_path: &Path, db_path: Option<PathBuf>) -> Result<()> {
    let path = resolve_db_path(config_path, db_path)?;
    let db = open_database(&path)?;
    let products = db.count_products()?;

    println!("Database ready at {}", path.display());
    println!("  products: {}", products);
    if products == 0 {
        println!();
        println!("Run 'lumiere seed' to load the launch catalog.");
    }
    Ok(())
}

pub fn cmd_seed(config_path: &Path, db_path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = resolve_db_path(config_path, db_path)?;
    let db = open_database(&path)?;

    let existing = db.count_products()?;
    if existing > 0 && !force {
        println!(
            "Catalog already has {} products at {}; skipping (use --force to seed anyway).",
            existing,
            path.display()
        );
        return Ok(());
    }

    let seeded = db.seed_products(default_catalog(), Utc::now())?;
    tracing::info!(count = seeded.len(), db = %path.display(), "Seeded catalog");

    println!("Seeded {} products into {}", seeded.len(), path.display());
    for product in &seeded {
        println!(
            "  {:<24} {:<10} {}",
            product.name,
            product.category.as_str(),
            product.price
        );
    }
    Ok(())
}
