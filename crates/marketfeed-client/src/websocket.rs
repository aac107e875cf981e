//! WebSocket client for the real-time price feed.

use crate::error::Error;
use crate::types::PriceSnapshot;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket message types received from the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    /// Connection established.
    #[serde(rename = "connected")]
    Connected {
        /// Welcome message.
        message: String,
    },
    /// Subscription confirmation.
    #[serde(rename = "subscribed")]
    Subscribed {
        /// Symbols subscribed to.
        symbols: Vec<String>,
        /// Timestamp in milliseconds.
        timestamp: u64,
    },
    /// Unsubscription confirmation.
    #[serde(rename = "unsubscribed")]
    Unsubscribed {
        /// Symbols unsubscribed from.
        symbols: Vec<String>,
        /// Timestamp in milliseconds.
        timestamp: u64,
    },
    /// Live price update for a subscribed symbol.
    #[serde(rename = "priceUpdate")]
    Price(PriceUpdateData),
    /// One-off snapshot reply.
    #[serde(rename = "snapshot")]
    Snapshot {
        /// Requested symbol.
        symbol: String,
        /// Cached snapshot, if any.
        snapshot: Option<PriceSnapshot>,
    },
    /// Heartbeat/ping.
    #[serde(rename = "heartbeat")]
    Heartbeat {
        /// Timestamp in milliseconds.
        timestamp: u64,
    },
    /// Error message.
    #[serde(rename = "error")]
    Error {
        /// Error message.
        message: String,
    },
}

/// Payload of a `priceUpdate` event: the snapshot fields flattened alongside
/// the symbol's category metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdateData {
    /// The updated snapshot.
    #[serde(flatten)]
    pub snapshot: PriceSnapshot,
    /// Category identifier, when the symbol is cataloged.
    pub category_id: Option<String>,
    /// Category name, when the symbol is cataloged.
    pub category_name: Option<String>,
}

/// Commands that can be sent to the server.
#[derive(Debug, Clone, Serialize)]
pub struct ClientCommand {
    /// Action to perform.
    pub action: String,
    /// Symbols for subscribe/unsubscribe commands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
    /// Single symbol for snapshot requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl ClientCommand {
    /// Creates a subscribe command.
    #[must_use]
    pub fn subscribe(symbols: &[&str]) -> Self {
        Self {
            action: "subscribe".to_string(),
            symbols: Some(symbols.iter().map(ToString::to_string).collect()),
            symbol: None,
        }
    }

    /// Creates an unsubscribe command.
    #[must_use]
    pub fn unsubscribe(symbols: &[&str]) -> Self {
        Self {
            action: "unsubscribe".to_string(),
            symbols: Some(symbols.iter().map(ToString::to_string).collect()),
            symbol: None,
        }
    }

    /// Creates a snapshot request command.
    #[must_use]
    pub fn get_snapshot(symbol: &str) -> Self {
        Self {
            action: "getSnapshot".to_string(),
            symbols: None,
            symbol: Some(symbol.to_string()),
        }
    }
}

/// Buffered events per connection; the feed drops overflow rather than
/// stalling the command path.
const EVENT_BUFFER: usize = 100;

/// WebSocket client for receiving real-time price updates.
///
/// Feed events and outgoing commands share one connection task. A consumer
/// that stops calling [`recv`](Self::recv) loses events beyond the buffer;
/// commands are never queued behind a slow consumer.
pub struct WsClient {
    rx: mpsc::Receiver<WsMessage>,
    tx: mpsc::Sender<ClientCommand>,
}

impl WsClient {
    /// Connects to the WebSocket server.
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:8080/ws")
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the connection fails.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let url = url::Url::parse(url)?;
        let (ws_stream, _) = connect_async(url.as_str()).await.map_err(Box::new)?;
        let (mut write, mut read) = ws_stream.split();

        let (msg_tx, msg_rx) = mpsc::channel::<WsMessage>(EVENT_BUFFER);
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<ClientCommand>(EVENT_BUFFER);

        // One pump for both directions; ends when the socket closes or the
        // WsClient is dropped (both channel ends gone).
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    incoming = read.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let Ok(event) = serde_json::from_str::<WsMessage>(&text) else {
                                continue;
                            };
                            match msg_tx.try_send(event) {
                                Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                                Err(mpsc::error::TrySendError::Closed(_)) => break,
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    outgoing = cmd_rx.recv() => match outgoing {
                        Some(cmd) => {
                            if let Ok(json) = serde_json::to_string(&cmd)
                                && write.send(Message::Text(json.into())).await.is_err()
                            {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        Ok(Self {
            rx: msg_rx,
            tx: cmd_tx,
        })
    }

    /// Receives the next message from the server.
    ///
    /// Returns `None` if the connection is closed.
    pub async fn recv(&mut self) -> Option<WsMessage> {
        self.rx.recv().await
    }

    /// Receives the next `priceUpdate`, discarding heartbeats, acks and
    /// other events along the way.
    ///
    /// Returns `None` if the connection is closed.
    pub async fn next_price(&mut self) -> Option<PriceUpdateData> {
        while let Some(event) = self.rx.recv().await {
            if let WsMessage::Price(update) = event {
                return Some(update);
            }
        }
        None
    }

    /// Sends a command to the server.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn send(&self, cmd: ClientCommand) -> Result<(), Error> {
        self.tx.send(cmd).await.map_err(|_| Error::ConnectionClosed)
    }

    /// Subscribes to live updates for the given symbols.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn subscribe(&self, symbols: &[&str]) -> Result<(), Error> {
        self.send(ClientCommand::subscribe(symbols)).await
    }

    /// Unsubscribes from live updates for the given symbols.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn unsubscribe(&self, symbols: &[&str]) -> Result<(), Error> {
        self.send(ClientCommand::unsubscribe(symbols)).await
    }

    /// Requests a one-off cached snapshot for a symbol.
    ///
    /// # Errors
    /// Returns error if the send fails.
    pub async fn get_snapshot(&self, symbol: &str) -> Result<(), Error> {
        self.send(ClientCommand::get_snapshot(symbol)).await
    }
}
