//! Configuration view and validation commands — `lumiere config`.

use anyhow::Result;
use std::path::Path;

use lumiere::config::LumiereToml;

use super::super::ConfigCommands;

fn show_secret(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.trim().is_empty() => "(set)",
        _ => "(not set)",
    }
}

fn print_config(toml: &LumiereToml) {
    println!("[server]");
    println!("  host = \"{}\"", toml.server.host);
    println!("  port = {}", toml.server.port);
    println!("  db_path = \"{}\"", toml.server.db_path.display());
    println!("  dev = {}", toml.server.dev);
    println!();

    println!("[store]");
    println!("  tax_rate = {}", toml.store.tax_rate);
    println!("  free_shipping_over = {}", toml.store.free_shipping_over);
    println!("  flat_shipping = {}", toml.store.flat_shipping);
    println!("  low_stock_threshold = {}", toml.store.low_stock_threshold);
    println!("  currency = \"{}\"", toml.store.currency);
    for (code, rate) in &toml.store.promo_codes {
        println!("  promo {} = {}%", code, rate * 100.0);
    }
    println!();

    println!("[admin]");
    println!("  username = \"{}\"", toml.admin.username);
    println!("  password = {}", show_secret(Some(&toml.admin.password)));
    println!();
}

pub fn cmd_config(config_path: &Path, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Lumiere Configuration");
            println!("=====================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                LumiereToml::load(config_path)?
            } else {
                println!("No lumiere.toml found at {}", config_path.display());
                println!("Using default configuration:");
                println!();
                LumiereToml::default()
            };
            print_config(&toml);

            // Secrets may come from the environment, so show what is effective.
            let effective = toml.with_env_overrides();
            println!("Effective values (with env overrides):");
            println!("  port = {}", effective.server.port);
            println!("  db_path = \"{}\"", effective.server.db_path.display());
            println!(
                "  stripe_secret_key = {}",
                show_secret(effective.stripe_secret_key().as_deref())
            );
            println!(
                "  emailjs = {}",
                if effective.email_settings().is_some() {
                    "configured"
                } else {
                    "log only"
                }
            );
            println!();
            if !config_path.exists() {
                println!("Run 'lumiere config init' to create a lumiere.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let toml = if config_path.exists() {
                LumiereToml::load(config_path)?
            } else {
                println!("No lumiere.toml found. Checking defaults.");
                LumiereToml::default()
            };
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("lumiere.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            LumiereToml::default().save(config_path)?;

            println!("Created lumiere.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] host, port, db_path");
            println!("  - [store] tax_rate, shipping, promo_codes");
            println!("  - [admin] username, password");
            println!("  - [payment] / [email] keys (or STRIPE_SECRET_KEY, EMAILJS_* in .env)");
            println!();
        }
    }

    Ok(())
}
