use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Payment intent status that lets an order through.
pub const INTENT_SUCCEEDED: &str = "succeeded";

/// A payment intent as handed to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// What the processor reports about an existing intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentStatus {
    pub id: String,
    pub status: String,
    pub amount_cents: i64,
    /// Lowercase ISO code.
    pub currency: String,
}

impl IntentStatus {
    pub fn succeeded(&self) -> bool {
        self.status == INTENT_SUCCEEDED
    }

    /// Whether this intent charged exactly `amount_cents` in `currency`.
    pub fn covers(&self, amount_cents: i64, currency: &str) -> bool {
        self.amount_cents == amount_cents && self.currency.eq_ignore_ascii_case(currency)
    }
}

/// A card processor able to open payment intents and report on them.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open an intent for `amount_cents` in `currency` (lowercase ISO code).
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> anyhow::Result<PaymentIntent>;

    /// Status and charged amount of an intent. The status is e.g. `succeeded`
    /// or `requires_payment_method`.
    async fn intent_status(&self, intent_id: &str) -> anyhow::Result<IntentStatus>;
}

/// Stripe's REST API.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

impl StripeIntentResponse {
    fn into_status(self) -> anyhow::Result<IntentStatus> {
        let status = self
            .status
            .with_context(|| format!("Stripe response for {} has no status", self.id))?;
        let amount_cents = self
            .amount
            .with_context(|| format!("Stripe response for {} has no amount", self.id))?;
        let currency = self
            .currency
            .with_context(|| format!("Stripe response for {} has no currency", self.id))?;
        Ok(IntentStatus {
            id: self.id,
            status,
            amount_cents,
            currency: currency.to_lowercase(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_api_base(secret_key, STRIPE_API_BASE)
    }

    pub fn with_api_base(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn read_intent(resp: reqwest::Response) -> anyhow::Result<StripeIntentResponse> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("Failed to read response from Stripe")?;
        if !status.is_success() {
            bail!("Stripe returned {}: {}", status, stripe_error_message(&body));
        }
        serde_json::from_str(&body).context("Failed to parse payment intent from Stripe")
    }
}

/// Form fields for `POST /payment_intents`.
fn intent_form(amount_cents: i64, currency: &str) -> Vec<(&'static str, String)> {
    vec![
        ("amount", amount_cents.to_string()),
        ("currency", currency.to_lowercase()),
        ("automatic_payment_methods[enabled]", "true".to_string()),
    ]
}

/// The human-readable part of a Stripe error body, or the raw body.
fn stripe_error_message(body: &str) -> String {
    serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, amount_cents: i64, currency: &str) -> anyhow::Result<PaymentIntent> {
        if amount_cents <= 0 {
            bail!("Payment amount must be positive");
        }
        let resp = self
            .client
            .post(format!("{}/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&intent_form(amount_cents, currency))
            .send()
            .await
            .context("Failed to send payment intent request to Stripe")?;
        let intent = Self::read_intent(resp).await?;
        let client_secret = intent
            .client_secret
            .context("Stripe response has no client_secret")?;
        tracing::info!(intent = %intent.id, amount_cents, "Created payment intent");
        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }

    async fn intent_status(&self, intent_id: &str) -> anyhow::Result<IntentStatus> {
        if !is_intent_id(intent_id) {
            bail!("'{}' is not a payment intent id", intent_id);
        }
        let resp = self
            .client
            .get(format!("{}/payment_intents/{}", self.api_base, intent_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .context("Failed to send payment intent lookup to Stripe")?;
        Self::read_intent(resp).await?.into_status()
    }
}

/// Whether `id` looks like a Stripe intent id (`pi_` then letters, digits
/// or underscores). Anything else must never reach a request path.
pub fn is_intent_id(id: &str) -> bool {
    id.strip_prefix("pi_").is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// The intent id embedded in a client secret (`pi_123_secret_abc` → `pi_123`).
pub fn intent_id_from_secret(secret: &str) -> Option<&str> {
    secret
        .split_once("_secret_")
        .map(|(id, _)| id)
        .filter(|id| !id.is_empty())
}
