//! Customer email notifications for order lifecycle events.
//!
//! ```text
//!   api handler ──► NotificationDispatcher ──(dedupe)──► tokio::spawn ──► Notifier
//!                                                                     ├── EmailJsNotifier
//!                                                                     └── LogNotifier
//! ```
//!
//! Sends never block or fail the request that triggered them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Context, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lumiere_common::{Money, Order, OrderEvent};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::EmailSettings;

const EMAILJS_SEND_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// What a customer is told about an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderNotice {
    pub event: OrderEvent,
    pub order_number: String,
    pub customer_name: String,
    pub email: String,
    pub total: Money,
    pub date: DateTime<Utc>,
}

impl OrderNotice {
    pub fn new(order: &Order, event: OrderEvent) -> Self {
        Self {
            event,
            order_number: order.order_number.clone(),
            customer_name: order.customer_name.clone(),
            email: order.email.clone(),
            total: order.total,
            date: order.date,
        }
    }

    pub fn dedupe_key(&self) -> String {
        self.event.dedupe_key(&self.order_number)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &OrderNotice) -> anyhow::Result<()>;
}

/// Writes notices to the log instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notice: &OrderNotice) -> anyhow::Result<()> {
        tracing::info!(
            order = %notice.order_number,
            event = %notice.event,
            to = %notice.email,
            "Order notification (email not configured)"
        );
        Ok(())
    }
}

/// Template variables for the order email.
#[derive(Debug, Serialize, PartialEq)]
struct TemplateParams {
    customer_name: String,
    order_id: String,
    order_date: String,
    order_total: String,
    order_status: String,
    is_confirmed: bool,
    is_cancelled: bool,
    is_pending: bool,
    is_shipped: bool,
    is_delivered: bool,
    to_email: String,
}

impl From<&OrderNotice> for TemplateParams {
    fn from(notice: &OrderNotice) -> Self {
        Self {
            customer_name: notice.customer_name.clone(),
            order_id: notice.order_number.clone(),
            order_date: notice.date.format("%-m/%-d/%Y").to_string(),
            order_total: notice.total.to_string(),
            order_status: notice.event.as_str().to_string(),
            is_confirmed: notice.event == OrderEvent::Confirmed,
            is_cancelled: notice.event == OrderEvent::Cancelled,
            is_pending: notice.event == OrderEvent::Pending,
            is_shipped: notice.event == OrderEvent::Shipped,
            is_delivered: notice.event == OrderEvent::Delivered,
            to_email: notice.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmailJsRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: TemplateParams,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
}

/// Sends through the EmailJS REST API.
pub struct EmailJsNotifier {
    client: reqwest::Client,
    settings: EmailSettings,
}

impl EmailJsNotifier {
    pub fn new(settings: EmailSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    fn request(&self, notice: &OrderNotice) -> EmailJsRequest<'_> {
        EmailJsRequest {
            service_id: &self.settings.service_id,
            template_id: &self.settings.template_id,
            user_id: &self.settings.public_key,
            template_params: TemplateParams::from(notice),
            access_token: self.settings.private_key.as_deref(),
        }
    }
}

#[async_trait]
impl Notifier for EmailJsNotifier {
    async fn send(&self, notice: &OrderNotice) -> anyhow::Result<()> {
        let url = self.settings.api_url.as_deref().unwrap_or(EMAILJS_SEND_URL);
        let resp = self
            .client
            .post(url)
            .json(&self.request(notice))
            .send()
            .await
            .context("Failed to send email request to EmailJS")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("EmailJS returned {}: {}", status, body.trim());
        }
        Ok(())
    }
}

/// Fans notices out to a `Notifier` in the background, at most once per
/// order and event.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    sent: Arc<Mutex<HashSet<String>>>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            sent: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// EmailJS when configured, otherwise the log.
    pub fn from_settings(settings: Option<EmailSettings>) -> Self {
        match settings {
            Some(settings) => Self::new(Arc::new(EmailJsNotifier::new(settings))),
            None => Self::new(Arc::new(LogNotifier)),
        }
    }

    /// Queue one notice per event. Returns the spawned sends.
    pub fn dispatch(&self, order: &Order, events: &[OrderEvent]) -> Vec<JoinHandle<()>> {
        events
            .iter()
            .filter_map(|event| self.dispatch_one(OrderNotice::new(order, *event)))
            .collect()
    }

    fn dispatch_one(&self, notice: OrderNotice) -> Option<JoinHandle<()>> {
        let key = notice.dedupe_key();
        {
            let mut sent = match self.sent.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !sent.insert(key.clone()) {
                tracing::debug!(key = %key, "Notification already sent; skipping");
                return None;
            }
        }

        let notifier = self.notifier.clone();
        let sent = self.sent.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = notifier.send(&notice).await {
                tracing::warn!(key = %key, error = %e, "Failed to send order notification");
                // Allow a later retry of the same event.
                if let Ok(mut sent) = sent.lock() {
                    sent.remove(&key);
                }
            }
        }))
    }
}
