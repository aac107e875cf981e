//! WebSocket handler for the real-time price feed.
//!
//! One socket maps to one hub client. Price updates arrive through the hub
//! channel; command acknowledgments and one-shot snapshots travel a local
//! channel owned by the connection, so both merge into a single ordered
//! stream on the send side.

use crate::engine::PriceUpdate;
use crate::hub::ClientId;
use crate::models::PriceSnapshot;
use crate::state::AppState;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// WebSocket message types sent to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    /// Connection established.
    #[serde(rename = "connected")]
    Connected {
        /// Welcome message.
        message: String,
    },
    /// Subscription acknowledgment.
    #[serde(rename = "subscribed")]
    Subscribed {
        /// Symbols covered by the acknowledgment.
        symbols: Vec<String>,
        /// Timestamp in milliseconds.
        timestamp: u64,
    },
    /// Unsubscription acknowledgment.
    #[serde(rename = "unsubscribed")]
    Unsubscribed {
        /// Symbols covered by the acknowledgment.
        symbols: Vec<String>,
        /// Timestamp in milliseconds.
        timestamp: u64,
    },
    /// Price update for a subscribed symbol.
    #[serde(rename = "priceUpdate")]
    Price(PricePayload),
    /// One-shot snapshot read; `snapshot` is null for uncached symbols.
    #[serde(rename = "snapshot")]
    Snapshot {
        /// Requested symbol.
        symbol: String,
        /// Cached snapshot, if any.
        snapshot: Option<PriceSnapshot>,
    },
    /// Command rejection.
    #[serde(rename = "error")]
    Error {
        /// What was wrong with the command.
        message: String,
    },
    /// Heartbeat/ping.
    #[serde(rename = "heartbeat")]
    Heartbeat {
        /// Timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Body of a `priceUpdate` event: the full snapshot plus category metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePayload {
    /// The merged snapshot, flattened into the payload object.
    #[serde(flatten)]
    pub snapshot: PriceSnapshot,
    /// Category id, when the symbol has been classified.
    pub category_id: Option<Uuid>,
    /// Category name, when the symbol has been classified.
    pub category_name: Option<String>,
}

impl From<PriceUpdate> for WsMessage {
    fn from(update: PriceUpdate) -> Self {
        WsMessage::Price(PricePayload {
            snapshot: update.snapshot,
            category_id: update.category_id,
            category_name: update.category_name,
        })
    }
}

/// Command sent by clients over the socket.
#[derive(Debug, Deserialize)]
pub struct ClientCommand {
    /// One of `subscribe`, `unsubscribe`, `getSnapshot`.
    pub action: String,
    /// Symbols for subscribe/unsubscribe.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    /// Single-symbol form, used by `getSnapshot`.
    #[serde(default)]
    pub symbol: Option<String>,
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Register with the hub before anything can publish to this client.
    let (client_id, mut update_rx) = state.hub.register();
    // Local channel for acks and snapshots produced by the command side.
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<WsMessage>();

    let connected = WsMessage::Connected {
        message: "Connected to market data feed".to_string(),
    };
    send_event(&mut sender, &connected).await;

    info!(client_id, "WebSocket client connected");

    let state_clone = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    debug!(client_id, "received WebSocket message: {}", text);
                    handle_client_message(&text, client_id, &reply_tx, &state_clone).await;
                }
                Ok(Message::Ping(_data)) => {
                    debug!(client_id, "received ping");
                    // Pong is handled automatically by axum.
                }
                Ok(Message::Close(_)) => {
                    info!(client_id, "WebSocket client disconnected");
                    break;
                }
                Err(e) => {
                    error!(client_id, "WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                update = update_rx.recv() => {
                    match update {
                        Some(update) => {
                            if !send_event(&mut sender, &WsMessage::from(update)).await {
                                break;
                            }
                        }
                        // Hub dropped the sender: the client was disconnected.
                        None => break,
                    }
                }
                reply = reply_rx.recv() => {
                    match reply {
                        Some(msg) => {
                            if !send_event(&mut sender, &msg).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                // Send periodic heartbeat
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(30)) => {
                    let heartbeat = WsMessage::Heartbeat {
                        timestamp: now_millis(),
                    };
                    if !send_event(&mut sender, &heartbeat).await {
                        break;
                    }
                }
            }
        }
    });

    // Whichever task finishes first ends the connection. The receive task
    // must be fully stopped before the hub entry goes away, or a buffered
    // subscribe could recreate rooms that disconnect already cleaned up.
    tokio::select! {
        _ = &mut recv_task => {
            send_task.abort();
        }
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
    }

    for symbol in state.hub.disconnect(client_id) {
        state.cache.unsubscribe(&symbol);
    }
    info!(client_id, "WebSocket connection closed");
}

/// Serializes and sends one event. Returns `false` once the socket is gone.
async fn send_event(sender: &mut SplitSink<WebSocket, Message>, msg: &WsMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            error!("failed to serialize WebSocket event: {}", e);
            true
        }
    }
}

/// Handle incoming client messages.
async fn handle_client_message(
    text: &str,
    client_id: ClientId,
    reply_tx: &mpsc::UnboundedSender<WsMessage>,
    state: &Arc<AppState>,
) {
    let Ok(cmd) = serde_json::from_str::<ClientCommand>(text) else {
        let _ = reply_tx.send(WsMessage::Error {
            message: "malformed command".to_string(),
        });
        return;
    };

    match cmd.action.as_str() {
        "subscribe" => {
            let symbols = command_symbols(&cmd);
            if symbols.is_empty() {
                let _ = reply_tx.send(WsMessage::Error {
                    message: "subscribe requires at least one symbol".to_string(),
                });
                return;
            }
            for symbol in &symbols {
                let outcome = state.hub.join(client_id, symbol);
                if outcome.newly_joined {
                    state.cache.subscribe(symbol);
                    // Current state right away; without this the next
                    // scheduled refresh would be the first thing the client
                    // sees.
                    if let Some(snapshot) = state.cache.get(symbol) {
                        let _ = reply_tx.send(WsMessage::from(state.engine.enrich(snapshot)));
                    }
                    let engine = Arc::clone(&state.engine);
                    let symbol = symbol.clone();
                    tokio::spawn(async move {
                        let _ = engine.refresh_symbol(&symbol, true).await;
                    });
                }
            }
            debug!(client_id, ?symbols, "client subscribed");
            let _ = reply_tx.send(WsMessage::Subscribed {
                symbols,
                timestamp: now_millis(),
            });
        }
        "unsubscribe" => {
            let symbols = command_symbols(&cmd);
            if symbols.is_empty() {
                let _ = reply_tx.send(WsMessage::Error {
                    message: "unsubscribe requires at least one symbol".to_string(),
                });
                return;
            }
            for symbol in &symbols {
                let outcome = state.hub.leave(client_id, symbol);
                if outcome.room_emptied {
                    state.cache.unsubscribe(symbol);
                }
            }
            debug!(client_id, ?symbols, "client unsubscribed");
            let _ = reply_tx.send(WsMessage::Unsubscribed {
                symbols,
                timestamp: now_millis(),
            });
        }
        "getSnapshot" => {
            let Some(symbol) = cmd
                .symbol
                .as_deref()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
            else {
                let _ = reply_tx.send(WsMessage::Error {
                    message: "getSnapshot requires a symbol".to_string(),
                });
                return;
            };
            let snapshot = state.cache.get(&symbol);
            let _ = reply_tx.send(WsMessage::Snapshot { symbol, snapshot });
        }
        other => {
            debug!(client_id, "unknown command: {}", other);
            let _ = reply_tx.send(WsMessage::Error {
                message: format!("unknown action: {}", other),
            });
        }
    }
}

/// Normalizes the symbol list of a command: `symbols` (falling back to the
/// single `symbol` field), trimmed, uppercased, empties dropped, duplicates
/// removed in order.
fn command_symbols(cmd: &ClientCommand) -> Vec<String> {
    let raw: Vec<String> = match (&cmd.symbols, &cmd.symbol) {
        (Some(symbols), _) => symbols.clone(),
        (None, Some(symbol)) => vec![symbol.clone()],
        (None, None) => Vec::new(),
    };

    let mut seen = HashSet::new();
    raw.iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}
