//! REST client for the storefront API, used by the admin CLI commands.

use lumiere_common::{
    Cart, CheckoutRequest, DashboardSummary, Order, OrderPatch, OrderStatus, PriceBreakdown,
    Product, ProductDraft, ProductPatch, QuoteRequest, Reconciliation,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::storefront::auth::LoginResponse;

/// Failures seen by REST callers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Build the error for a failed response from its status and body.
fn api_error(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}

pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(resp: Response) -> ClientResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> ClientResult<T> {
        let resp = Self::check(builder.send().await?).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        Self::send(self.request(method, path).json(body)).await
    }

    // ── Admin session ────────────────────────────────────────────────

    /// Log in and keep the issued token for later calls.
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<String> {
        let resp: LoginResponse = self
            .send_json(
                Method::POST,
                "/api/admin/login",
                &serde_json::json!({"username": username, "password": password}),
            )
            .await?;
        self.token = Some(resp.token.clone());
        Ok(resp.token)
    }

    pub async fn health(&self) -> ClientResult<String> {
        let resp = Self::check(self.request(Method::GET, "/health").send().await?).await?;
        Ok(resp.text().await?)
    }

    // ── Products ─────────────────────────────────────────────────────

    pub async fn list_products(&self) -> ClientResult<Vec<Product>> {
        Self::send(self.request(Method::GET, "/api/products")).await
    }

    pub async fn get_product(&self, id: &str) -> ClientResult<Product> {
        Self::send(self.request(Method::GET, &format!("/api/products/{}", id))).await
    }

    pub async fn create_product(&self, draft: &ProductDraft) -> ClientResult<Product> {
        self.send_json(Method::POST, "/api/products", draft).await
    }

    pub async fn replace_product(&self, id: &str, draft: &ProductDraft) -> ClientResult<Product> {
        self.send_json(Method::PUT, &format!("/api/products/{}", id), draft)
            .await
    }

    pub async fn patch_product(&self, id: &str, patch: &ProductPatch) -> ClientResult<Product> {
        self.send_json(Method::PATCH, &format!("/api/products/{}", id), patch)
            .await
    }

    pub async fn delete_product(&self, id: &str) -> ClientResult<()> {
        Self::check(
            self.request(Method::DELETE, &format!("/api/products/{}", id))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    pub async fn restock(&self, id: &str, size: &str, amount: u32) -> ClientResult<Product> {
        self.send_json(
            Method::POST,
            &format!("/api/products/{}/restock", id),
            &serde_json::json!({"size": size, "amount": amount}),
        )
        .await
    }

    /// Visible products matching collection filters such as
    /// `[("category", "Floral"), ("sort", "price-low")]`.
    pub async fn catalog(&self, filters: &[(&str, &str)]) -> ClientResult<Vec<Product>> {
        Self::send(self.request(Method::GET, "/api/catalog").query(filters)).await
    }

    pub async fn featured(&self) -> ClientResult<Vec<Product>> {
        Self::send(self.request(Method::GET, "/api/catalog/featured")).await
    }

    // ── Cart and checkout ────────────────────────────────────────────

    pub async fn reconcile_cart(&self, cart: &Cart) -> ClientResult<Reconciliation> {
        self.send_json(Method::POST, "/api/cart/reconcile", cart).await
    }

    pub async fn quote(&self, request: &QuoteRequest) -> ClientResult<PriceBreakdown> {
        self.send_json(Method::POST, "/api/checkout/quote", request)
            .await
    }

    /// Returns the client secret of a new payment intent.
    pub async fn create_payment_intent(&self, amount_cents: i64) -> ClientResult<String> {
        let resp: serde_json::Value = self
            .send_json(
                Method::POST,
                "/api/payment/create-payment-intent",
                &serde_json::json!({"amount": amount_cents}),
            )
            .await?;
        Ok(resp["clientSecret"].as_str().unwrap_or_default().to_string())
    }

    pub async fn place_order(&self, request: &CheckoutRequest) -> ClientResult<Order> {
        self.send_json(Method::POST, "/api/orders", request).await
    }

    // ── Orders ───────────────────────────────────────────────────────

    pub async fn list_orders(
        &self,
        status: Option<OrderStatus>,
        search: Option<&str>,
    ) -> ClientResult<Vec<Order>> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(status) = status {
            query.push(("status", status.as_str()));
        }
        if let Some(search) = search {
            query.push(("q", search));
        }
        Self::send(self.request(Method::GET, "/api/orders").query(&query)).await
    }

    pub async fn get_order(&self, id: &str) -> ClientResult<Order> {
        Self::send(self.request(Method::GET, &format!("/api/orders/{}", id))).await
    }

    pub async fn update_order(&self, id: &str, patch: &OrderPatch) -> ClientResult<Order> {
        self.send_json(Method::PATCH, &format!("/api/orders/{}", id), patch)
            .await
    }

    pub async fn delete_order(&self, id: &str) -> ClientResult<()> {
        Self::check(
            self.request(Method::DELETE, &format!("/api/orders/{}", id))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    pub async fn dashboard(&self) -> ClientResult<DashboardSummary> {
        Self::send(self.request(Method::GET, "/api/admin/dashboard")).await
    }
}
