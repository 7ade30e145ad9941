use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use lumiere_common::{
    CartAdjustment, CatalogQuery, CheckoutRequest, DomainError, Money, OrderEvent, OrderPatch,
    OrderStatus, PricingPolicy, ProductDraft, ProductPatch, QuoteRequest, Reconciliation,
    draft_order, featured, quote, reconcile, summarize,
};
use serde::Deserialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::auth::{AdminAuth, LoginRequest, LoginResponse};
use super::db::{DbHandle, OrderFilter};
#[cfg(test)]
use super::db::StoreDb;
use super::notify::NotificationDispatcher;
use super::payment::{PaymentGateway, StripeGateway, intent_id_from_secret, is_intent_id};
use super::ws::{StoreEvent, broadcast_message, broadcast_stock_changes};
use crate::config::LumiereToml;
use crate::errors::StoreError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub ws_tx: broadcast::Sender<String>,
    pub policy: PricingPolicy,
    pub currency: String,
    pub low_stock_threshold: u32,
    /// `None` when no payment processor is configured.
    pub payment: Option<Arc<dyn PaymentGateway>>,
    pub notifier: NotificationDispatcher,
    pub auth: AdminAuth,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(db: DbHandle, ws_tx: broadcast::Sender<String>, config: &LumiereToml) -> Self {
        let payment = config.stripe_secret_key().map(|key| {
            let gateway = match &config.payment.api_base {
                Some(base) => StripeGateway::with_api_base(key, base.clone()),
                None => StripeGateway::new(key),
            };
            Arc::new(gateway) as Arc<dyn PaymentGateway>
        });
        if payment.is_none() {
            tracing::warn!("No Stripe secret key configured; payments disabled");
        }
        Self {
            db,
            ws_tx,
            policy: config.pricing_policy(),
            currency: config.store.currency.clone(),
            low_stock_threshold: config.store.low_stock_threshold,
            payment,
            notifier: NotificationDispatcher::from_settings(config.email_settings()),
            auth: AdminAuth::new(&config.admin.username, &config.admin.password),
        }
    }

    pub fn with_payment(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.payment = Some(gateway);
        self
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RestockRequest {
    pub size: String,
    pub amount: u32,
}

#[derive(Deserialize)]
pub struct PaymentIntentRequest {
    /// Amount in cents.
    pub amount: i64,
}

/// Collection filters as they arrive in the query string. `"All"` or an
/// absent value means no filter.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub category: Option<String>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub sort: Option<String>,
}

impl CatalogParams {
    fn into_query(self) -> Result<CatalogQuery, DomainError> {
        let chosen = |value: Option<String>| {
            value.filter(|v| !v.trim().is_empty() && !v.trim().eq_ignore_ascii_case("all"))
        };
        Ok(CatalogQuery {
            category: chosen(self.category).map(|c| c.parse()).transpose()?,
            price: chosen(self.price).unwrap_or_default().parse()?,
            size: chosen(self.size).map(|s| s.trim().to_string()),
            sort: self.sort.unwrap_or_default().parse()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub q: Option<String>,
}

impl OrderListParams {
    fn into_filter(self) -> Result<OrderFilter, DomainError> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(s.parse::<OrderStatus>()?),
        };
        Ok(OrderFilter {
            status,
            query: self.q.filter(|q| !q.trim().is_empty()),
        })
    }
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    PaymentRequired(String),
    Conflict(String),
    BadGateway(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::ProductNotFound { .. } | StoreError::OrderNotFound { .. } => {
                ApiError::NotFound(message)
            }
            StoreError::Domain(DomainError::InsufficientStock { .. }) => ApiError::Conflict(message),
            StoreError::Domain(_)
            | StoreError::BadRequest(_)
            | StoreError::PaymentMissing
            | StoreError::InvalidPaymentIntent(_) => ApiError::BadRequest(message),
            StoreError::PaymentReused { .. } => ApiError::Conflict(message),
            StoreError::InvalidCredentials | StoreError::Unauthorized => {
                ApiError::Unauthorized(message)
            }
            StoreError::PaymentIncomplete { .. } | StoreError::PaymentMismatch { .. } => {
                ApiError::PaymentRequired(message)
            }
            StoreError::PaymentNotConfigured => ApiError::Unavailable(message),
            StoreError::PaymentProvider(_) => ApiError::BadGateway(message),
            StoreError::Database(e) => {
                tracing::error!(error = ?e, "Database error");
                ApiError::Internal(message)
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        StoreError::Domain(err).into()
    }
}

fn db_error(err: anyhow::Error) -> ApiError {
    StoreError::from_anyhow(err).into()
}

/// Extractor that admits only requests carrying an issued admin token.
pub struct Admin;

impl FromRequestParts<SharedState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        state.auth.authorize(&parts.headers)?;
        Ok(Admin)
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product)
                .put(replace_product)
                .patch(patch_product)
                .delete(delete_product),
        )
        .route("/api/products/{id}/restock", post(restock_product))
        .route("/api/catalog", get(catalog))
        .route("/api/catalog/featured", get(featured_products))
        .route("/api/cart/reconcile", post(reconcile_cart))
        .route("/api/checkout/quote", post(checkout_quote))
        .route(
            "/api/payment/create-payment-intent",
            post(create_payment_intent),
        )
        .route("/api/orders", get(list_orders).post(place_order))
        .route(
            "/api/orders/{id}",
            get(get_order).patch(update_order).delete(delete_order),
        )
        .route("/api/admin/login", post(admin_login))
        .route("/api/admin/dashboard", get(dashboard))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn root() -> &'static str {
    "API is running..."
}

async fn health_check() -> &'static str {
    "ok"
}

// Products

async fn list_products(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .db
        .call(|db| db.list_products())
        .await
        .map_err(db_error)?;
    Ok(Json(products))
}

async fn get_product(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let product = state
        .db
        .call(move |db| db.get_product(&lookup))
        .await
        .map_err(db_error)?;
    match product {
        Some(product) => Ok(Json(product)),
        None => Err(StoreError::ProductNotFound { id }.into()),
    }
}

async fn create_product(
    _admin: Admin,
    State(state): State<SharedState>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .db
        .call(move |db| db.create_product(draft, Utc::now()))
        .await
        .map_err(db_error)?;
    tracing::info!(product = %product.name, id = %product.id, "Product created");
    broadcast_message(
        &state.ws_tx,
        &StoreEvent::ProductCreated {
            product: product.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(product)))
}

async fn replace_product(
    _admin: Admin,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .db
        .call(move |db| db.replace_product(&id, draft, Utc::now()))
        .await
        .map_err(db_error)?;
    broadcast_message(
        &state.ws_tx,
        &StoreEvent::ProductUpdated {
            product: product.clone(),
        },
    );
    Ok(Json(product))
}

async fn patch_product(
    _admin: Admin,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .db
        .call(move |db| db.patch_product(&id, patch, Utc::now()))
        .await
        .map_err(db_error)?;
    broadcast_message(
        &state.ws_tx,
        &StoreEvent::ProductUpdated {
            product: product.clone(),
        },
    );
    Ok(Json(product))
}

async fn delete_product(
    _admin: Admin,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = id.clone();
    let deleted = state
        .db
        .call(move |db| db.delete_product(&target))
        .await
        .map_err(db_error)?;
    if !deleted {
        return Err(StoreError::ProductNotFound { id }.into());
    }
    tracing::info!(id = %id, "Product deleted");
    broadcast_message(&state.ws_tx, &StoreEvent::ProductDeleted { product_id: id });
    Ok(Json(
        serde_json::json!({"message": "Product deleted successfully"}),
    ))
}

async fn restock_product(
    _admin: Admin,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .db
        .call(move |db| db.restock_product(&id, &req.size, req.amount, Utc::now()))
        .await
        .map_err(db_error)?;
    broadcast_stock_changes(
        &state.ws_tx,
        std::slice::from_ref(&product),
        state.low_stock_threshold,
    );
    Ok(Json(product))
}

// Storefront

async fn catalog(
    State(state): State<SharedState>,
    Query(params): Query<CatalogParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.into_query()?;
    let products = state
        .db
        .call(|db| db.list_products())
        .await
        .map_err(db_error)?;
    let matching: Vec<_> = query.apply(&products).into_iter().cloned().collect();
    Ok(Json(matching))
}

async fn featured_products(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .db
        .call(|db| db.list_products())
        .await
        .map_err(db_error)?;
    let picks: Vec<_> = featured(&products).into_iter().cloned().collect();
    Ok(Json(picks))
}

/// Re-check client cart lines against the live catalog.
async fn reconcile_with_store(
    state: &SharedState,
    items: Vec<lumiere_common::CartItem>,
) -> Result<(lumiere_common::Cart, Vec<CartAdjustment>), ApiError> {
    let products = state
        .db
        .call(|db| db.list_products())
        .await
        .map_err(db_error)?;
    let cart = lumiere_common::Cart { items };
    Ok(reconcile(&cart, |id| products.iter().find(|p| p.id == id)))
}

async fn reconcile_cart(
    State(state): State<SharedState>,
    Json(cart): Json<lumiere_common::Cart>,
) -> Result<impl IntoResponse, ApiError> {
    let (fresh, adjustments) = reconcile_with_store(&state, cart.items).await?;
    Ok(Json(Reconciliation {
        cart: fresh.view(),
        adjustments,
    }))
}

async fn checkout_quote(
    State(state): State<SharedState>,
    Json(req): Json<QuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (cart, _) = reconcile_with_store(&state, req.items).await?;
    let breakdown = quote(&cart, &state.policy, req.promo_code.as_deref())?;
    Ok(Json(breakdown))
}

async fn create_payment_intent(
    State(state): State<SharedState>,
    Json(req): Json<PaymentIntentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let gateway = state
        .payment
        .as_ref()
        .ok_or(StoreError::PaymentNotConfigured)?;
    if req.amount <= 0 {
        return Err(
            StoreError::BadRequest("Amount must be a positive number of cents".into()).into(),
        );
    }
    let intent = gateway
        .create_intent(req.amount, &state.currency)
        .await
        .map_err(|e| StoreError::PaymentProvider(e.to_string()))?;
    Ok(Json(serde_json::json!({"clientSecret": intent.client_secret})))
}

/// Confirm the intent backing an order has been paid, for exactly
/// `due_cents` in `currency`.
async fn verify_payment(
    gateway: &dyn PaymentGateway,
    intent: Option<&str>,
    due_cents: i64,
    currency: &str,
) -> Result<String, StoreError> {
    let raw = intent
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .ok_or(StoreError::PaymentMissing)?;
    let intent_id = intent_id_from_secret(raw).unwrap_or(raw);
    if !is_intent_id(intent_id) {
        return Err(StoreError::InvalidPaymentIntent(intent_id.to_string()));
    }
    let paid = gateway
        .intent_status(intent_id)
        .await
        .map_err(|e| StoreError::PaymentProvider(e.to_string()))?;
    if !paid.succeeded() {
        tracing::warn!(intent = %intent_id, status = %paid.status, "Order rejected: payment incomplete");
        return Err(StoreError::PaymentIncomplete {
            status: paid.status,
        });
    }
    if !paid.covers(due_cents, currency) {
        tracing::warn!(
            intent = %intent_id,
            paid_cents = paid.amount_cents,
            paid_currency = %paid.currency,
            due_cents,
            "Order rejected: payment does not match total"
        );
        return Err(StoreError::PaymentMismatch {
            paid: format!("{} {}", Money::from_cents(paid.amount_cents), paid.currency),
            due: format!("{} {}", Money::from_cents(due_cents), currency.to_lowercase()),
        });
    }
    Ok(intent_id.to_string())
}

// Orders

async fn place_order(
    State(state): State<SharedState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.form.validate()?;

    let (cart, adjustments) = reconcile_with_store(&state, req.items).await?;
    let stale = adjustments
        .iter()
        .any(|a| !matches!(a, CartAdjustment::PriceChanged { .. }));
    if stale {
        return Err(ApiError::Conflict(
            "Some items in your cart are no longer available in the requested quantity".into(),
        ));
    }
    let breakdown = quote(&cart, &state.policy, req.promo_code.as_deref())?;

    let payment_intent_id = match &state.payment {
        Some(gateway) => Some(
            verify_payment(
                gateway.as_ref(),
                req.payment_intent_id.as_deref(),
                breakdown.amount_in_cents(),
                &state.currency,
            )
            .await?,
        ),
        None => req.payment_intent_id.clone(),
    };

    let suffix = (Uuid::new_v4().as_u128() % 1000) as u32;
    let order = draft_order(
        &req.form,
        &cart,
        &breakdown,
        payment_intent_id,
        Utc::now(),
        suffix,
    )?;

    let stored = order.clone();
    let touched = state
        .db
        .call(move |db| db.place_order(&stored, Utc::now()))
        .await
        .map_err(db_error)?;

    tracing::info!(
        order = %order.order_number,
        total = %order.total,
        items = order.item_count,
        "Order placed"
    );
    broadcast_message(&state.ws_tx, &StoreEvent::OrderPlaced { order: order.clone() });
    broadcast_stock_changes(&state.ws_tx, &touched, state.low_stock_threshold);
    state.notifier.dispatch(&order, &[OrderEvent::Pending]);

    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    _admin: Admin,
    State(state): State<SharedState>,
    Query(params): Query<OrderListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = params.into_filter()?;
    let orders = state
        .db
        .call(move |db| db.list_orders(&filter))
        .await
        .map_err(db_error)?;
    Ok(Json(orders))
}

async fn get_order(
    _admin: Admin,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let order = state
        .db
        .call(move |db| db.get_order(&lookup))
        .await
        .map_err(db_error)?;
    match order {
        Some(order) => Ok(Json(order)),
        None => Err(StoreError::OrderNotFound { id }.into()),
    }
}

async fn update_order(
    _admin: Admin,
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> Result<impl IntoResponse, ApiError> {
    if patch.is_empty() {
        return Err(StoreError::BadRequest("No order changes supplied".into()).into());
    }
    let update = state
        .db
        .call(move |db| db.update_order(&id, patch, Utc::now()))
        .await
        .map_err(db_error)?;

    tracing::info!(
        order = %update.order.order_number,
        status = %update.order.status,
        shipped = update.order.shipped,
        delivered = update.order.delivered,
        "Order updated"
    );
    broadcast_message(
        &state.ws_tx,
        &StoreEvent::OrderUpdated {
            order: update.order.clone(),
        },
    );
    broadcast_stock_changes(&state.ws_tx, &update.restocked, state.low_stock_threshold);
    state.notifier.dispatch(&update.order, &update.events);

    Ok(Json(update.order))
}

async fn delete_order(
    _admin: Admin,
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = id.clone();
    let deleted = state
        .db
        .call(move |db| db.delete_order(&target))
        .await
        .map_err(db_error)?;
    if !deleted {
        return Err(StoreError::OrderNotFound { id }.into());
    }
    broadcast_message(&state.ws_tx, &StoreEvent::OrderDeleted { order_id: id });
    Ok(Json(serde_json::json!({"message": "Order deleted successfully"})))
}

// Admin

async fn admin_login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = state.auth.login(&req.username, &req.password)?;
    Ok(Json(LoginResponse { token }))
}

async fn dashboard(
    _admin: Admin,
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let threshold = state.low_stock_threshold;
    let summary = state
        .db
        .call(move |db| {
            let products = db.list_products()?;
            let orders = db.list_orders(&OrderFilter::default())?;
            Ok(summarize(&products, &orders, Utc::now(), threshold))
        })
        .await
        .map_err(db_error)?;
    Ok(Json(summary))
}

// ── Tests ─────────────────────────────────────────────────────────────
