use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use lumiere_common::{Order, Product, SizeStocks, StockLevel};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Admin dashboards are pinged this often.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// A dashboard silent for this long after a ping is dropped.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── Event types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreEvent {
    ProductCreated {
        product: Product,
    },
    ProductUpdated {
        product: Product,
    },
    ProductDeleted {
        product_id: String,
    },
    OrderPlaced {
        order: Order,
    },
    OrderUpdated {
        order: Order,
    },
    OrderDeleted {
        order_id: String,
    },
    StockLow {
        product_id: String,
        name: String,
        level: StockLevel,
        size_stocks: SizeStocks,
    },
}

// ── WebSocket handler ────────────────────────────────────────────────

/// `GET /ws`: stream store events to an admin dashboard.
pub async fn live_updates(ws: WebSocketUpgrade, tx: broadcast::Sender<String>) -> impl IntoResponse {
    let events = tx.subscribe();
    ws.on_upgrade(move |socket| async move {
        let (outbound, inbound) = socket.split();
        tracing::debug!("Dashboard connected");
        relay_events(outbound, inbound, events).await;
        tracing::debug!("Dashboard disconnected");
    })
}

/// Liveness of one dashboard connection.
struct Heartbeat {
    last_pong: Instant,
    pinged: bool,
}

impl Heartbeat {
    fn new() -> Self {
        Self {
            last_pong: Instant::now(),
            pinged: false,
        }
    }

    fn is_dead(&self) -> bool {
        self.pinged && self.last_pong.elapsed() > PONG_TIMEOUT
    }

    fn pong(&mut self) {
        self.last_pong = Instant::now();
        self.pinged = false;
    }
}

/// Push every store event to the dashboard until it leaves or stops
/// answering pings.
async fn relay_events(
    mut outbound: SplitSink<WebSocket, Message>,
    mut inbound: SplitStream<WebSocket>,
    mut events: broadcast::Receiver<String>,
) {
    let mut pings = tokio::time::interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
    let mut heartbeat = Heartbeat::new();

    loop {
        tokio::select! {
            _ = pings.tick() => {
                if heartbeat.is_dead() {
                    tracing::debug!("Dashboard stopped answering pings");
                    break;
                }
                if outbound.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
                heartbeat.pinged = true;
            }

            event = events.recv() => match event {
                Ok(json) => {
                    if outbound.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dashboard too slow; store events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            frame = inbound.next() => match frame {
                Some(Ok(Message::Pong(_))) => heartbeat.pong(),
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = outbound.send(Message::Close(None)).await;
}

// ── Broadcast helpers ────────────────────────────────────────────────

/// Send `msg` to every connected dashboard, if any.
pub fn broadcast_message(tx: &broadcast::Sender<String>, msg: &StoreEvent) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize store event");
        }
    }
}

/// Broadcast an update for each product whose stock moved, plus a
/// `StockLow` alert for those now at or under `threshold`.
pub fn broadcast_stock_changes(
    tx: &broadcast::Sender<String>,
    products: &[Product],
    threshold: u32,
) {
    for product in products {
        broadcast_message(
            tx,
            &StoreEvent::ProductUpdated {
                product: product.clone(),
            },
        );
        let level = product.size_stocks.level(threshold);
        if level != StockLevel::InStock {
            tracing::info!(product = %product.name, ?level, "Stock running low");
            broadcast_message(
                tx,
                &StoreEvent::StockLow {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    level,
                    size_stocks: product.size_stocks.clone(),
                },
            );
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lumiere_common::{Category, Money, ProductDraft};

    fn product(stock: u32) -> Product {
        let mut draft = ProductDraft::new("Ocean Breeze", Category::Fresh, Money::from_dollars(16.5));
        draft.size_stocks = SizeStocks::from([("50ml", stock), ("100ml", 40)]);
        draft
            .into_product("p2".into(), Utc::now(), Utc::now(), None)
            .unwrap()
    }

    #[test]
    fn test_product_deleted_serialization() {
        let msg = StoreEvent::ProductDeleted {
            product_id: "p9".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"ProductDeleted\""));
        assert!(json.contains("\"product_id\":\"p9\""));
    }

    #[test]
    fn test_product_created_carries_storefront_fields() {
        let msg = StoreEvent::ProductCreated {
            product: product(20),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ProductCreated");
        assert_eq!(json["data"]["product"]["name"], "Ocean Breeze");
        assert_eq!(json["data"]["product"]["sizeStocks"]["50ml"], 20);
    }

    #[test]
    fn test_stock_low_serialization() {
        let msg = StoreEvent::StockLow {
            product_id: "p2".into(),
            name: "Ocean Breeze".into(),
            level: StockLevel::OutOfStock,
            size_stocks: SizeStocks::from([("50ml", 0)]),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"level\":\"out_of_stock\""));
    }

    #[test]
    fn test_broadcast_message_delivers_to_subscribers() {
        let (tx, mut rx) = broadcast::channel::<String>(16);
        let msg = StoreEvent::OrderDeleted {
            order_id: "o1".into(),
        };
        broadcast_message(&tx, &msg);
        let received = rx.try_recv().unwrap();
        assert!(received.contains("OrderDeleted"));
    }

    #[test]
    fn test_broadcast_message_no_receivers_does_not_panic() {
        let (tx, _) = broadcast::channel::<String>(16);
        broadcast_message(
            &tx,
            &StoreEvent::ProductDeleted {
                product_id: "p1".into(),
            },
        );
    }

    #[test]
    fn test_stock_changes_alert_only_when_low() {
        let (tx, mut rx) = broadcast::channel::<String>(16);
        broadcast_stock_changes(&tx, &[product(50), product(3)], 10);

        let mut kinds = Vec::new();
        while let Ok(json) = rx.try_recv() {
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            kinds.push(value["type"].as_str().unwrap().to_string());
        }
        assert_eq!(
            kinds,
            vec!["ProductUpdated", "ProductUpdated", "StockLow"]
        );
    }

    #[test]
    fn test_keepalive_constants_are_reasonable() {
        assert!(PONG_TIMEOUT > PING_INTERVAL);
        assert_eq!(PING_INTERVAL, Duration::from_secs(30));
    }

    #[test]
    fn test_heartbeat_dead_only_after_unanswered_ping() {
        let Some(long_ago) = Instant::now().checked_sub(PONG_TIMEOUT * 2) else {
            return;
        };
        let mut heartbeat = Heartbeat {
            last_pong: long_ago,
            pinged: false,
        };
        assert!(!heartbeat.is_dead());

        heartbeat.pinged = true;
        assert!(heartbeat.is_dead());

        heartbeat.pong();
        assert!(!heartbeat.is_dead());
    }
}
