//! Storefront configuration, read from `lumiere.toml`.
//!
//! Settings are layered: file → environment → CLI. Secrets for the payment
//! processor and the email service may be left out of the file and supplied
//! through the environment (a `.env` file is loaded at startup).
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 5050
//! db_path = ".lumiere/store.db"
//! dev = false
//!
//! [store]
//! tax_rate = 0.08
//! free_shipping_over = 150.0
//! flat_shipping = 15.0
//! low_stock_threshold = 10
//! currency = "usd"
//!
//! [store.promo_codes]
//! WELCOME10 = 0.1
//! SAVE20 = 0.2
//! LUXURY15 = 0.15
//!
//! [admin]
//! username = "admin"
//! password = "admin123"
//!
//! [payment]
//! stripe_secret_key = "sk_test_..."
//!
//! [email]
//! service_id = "service_..."
//! template_id = "template_..."
//! public_key = "..."
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lumiere_common::pricing::default_promo_codes;
use lumiere_common::{Money, PricingPolicy, LOW_STOCK_THRESHOLD};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "lumiere.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Permissive CORS for a locally served front end.
    #[serde(default)]
    pub dev: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5050
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".lumiere/store.db")
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            dev: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default = "default_free_shipping_over")]
    pub free_shipping_over: Money,
    #[serde(default = "default_flat_shipping")]
    pub flat_shipping: Money,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_promo_codes")]
    pub promo_codes: BTreeMap<String, f64>,
}

fn default_tax_rate() -> f64 {
    0.08
}

fn default_free_shipping_over() -> Money {
    Money::from_cents(150_00)
}

fn default_flat_shipping() -> Money {
    Money::from_cents(15_00)
}

fn default_low_stock_threshold() -> u32 {
    LOW_STOCK_THRESHOLD
}

fn default_currency() -> String {
    "usd".to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            free_shipping_over: default_free_shipping_over(),
            flat_shipping: default_flat_shipping(),
            low_stock_threshold: default_low_stock_threshold(),
            currency: default_currency(),
            promo_codes: default_promo_codes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSection {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default = "default_admin_password")]
    pub password: String,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

impl Default for AdminSection {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            password: default_admin_password(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentSection {
    /// Stripe secret key. Falls back to `STRIPE_SECRET_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_secret_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Optional EmailJS private key, sent as `accessToken`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// Resolved EmailJS credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailSettings {
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    pub private_key: Option<String>,
    pub api_url: Option<String>,
}

/// The complete lumiere.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LumiereToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub admin: AdminSection,
    #[serde(default)]
    pub payment: PaymentSection,
    #[serde(default)]
    pub email: EmailSection,
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl LumiereToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse lumiere.toml")
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize lumiere.toml")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `PORT` and `LUMIERE_DB_PATH` from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(port) = env_non_empty("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = env_non_empty("LUMIERE_DB_PATH") {
            self.server.db_path = PathBuf::from(path);
        }
        self
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            tax_rate: self.store.tax_rate,
            free_shipping_over: self.store.free_shipping_over,
            flat_shipping: self.store.flat_shipping,
            promo_codes: self
                .store
                .promo_codes
                .iter()
                .map(|(code, rate)| (code.trim().to_uppercase(), *rate))
                .collect(),
        }
    }

    /// Stripe secret key from the file, falling back to `STRIPE_SECRET_KEY`.
    pub fn stripe_secret_key(&self) -> Option<String> {
        self.payment
            .stripe_secret_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env_non_empty("STRIPE_SECRET_KEY"))
    }

    /// EmailJS settings, file first then `EMAILJS_*` variables. `None` unless
    /// service, template and public key are all known.
    pub fn email_settings(&self) -> Option<EmailSettings> {
        let pick = |value: &Option<String>, env: &str| {
            value
                .clone()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| env_non_empty(env))
        };
        Some(EmailSettings {
            service_id: pick(&self.email.service_id, "EMAILJS_SERVICE_ID")?,
            template_id: pick(&self.email.template_id, "EMAILJS_TEMPLATE_ID")?,
            public_key: pick(&self.email.public_key, "EMAILJS_PUBLIC_KEY")?,
            private_key: pick(&self.email.private_key, "EMAILJS_PRIVATE_KEY"),
            api_url: self.email.api_url.clone(),
        })
    }

    /// Check the configuration and return human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(0.0..1.0).contains(&self.store.tax_rate) {
            warnings.push(format!(
                "Invalid tax_rate {}: should be a fraction between 0 and 1 (e.g. 0.08)",
                self.store.tax_rate
            ));
        }
        if self.store.flat_shipping.cents() < 0 {
            warnings.push("flat_shipping must not be negative".to_string());
        }
        if self.store.free_shipping_over.cents() < 0 {
            warnings.push("free_shipping_over must not be negative".to_string());
        }
        for (code, rate) in &self.store.promo_codes {
            if !(*rate > 0.0 && *rate <= 1.0) {
                warnings.push(format!(
                    "Promo code '{}' has rate {}: should be greater than 0 and at most 1",
                    code, rate
                ));
            }
        }
        if self.store.currency.trim().len() != 3 {
            warnings.push(format!(
                "Currency '{}' should be a three-letter ISO code",
                self.store.currency
            ));
        }
        if self.server.port == 0 {
            warnings.push("server.port is 0: the OS will pick a random port".to_string());
        }
        if self.admin.username.trim().is_empty() || self.admin.password.is_empty() {
            warnings.push("Admin username and password must not be empty".to_string());
        }
        if self.admin == AdminSection::default() {
            warnings.push("Admin credentials are the defaults (admin/admin123)".to_string());
        }
        if self.stripe_secret_key().is_none() {
            warnings.push(
                "No Stripe secret key configured: payment intents are disabled".to_string(),
            );
        }
        if self.email_settings().is_none() {
            warnings.push(
                "EmailJS is not fully configured: order emails will only be logged".to_string(),
            );
        }

        warnings
    }
}
