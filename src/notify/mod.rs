//! Per-user fan-out of bot and trade events to connected UI listeners.

use crate::types::network::Network;
use crate::types::trade_log::TradeLog;
use anyhow::{anyhow, Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Wire shape of everything pushed to listeners.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    BotStatus {
        network: String,
        #[serde(rename = "isRunning")]
        is_running: bool,
    },
    NewTrade {
        trade: TradeLog,
    },
}

impl NotificationEvent {
    pub fn bot_status(network: Network, is_running: bool) -> Self {
        NotificationEvent::BotStatus {
            network: network.as_str().to_string(),
            is_running,
        }
    }

    pub fn new_trade(trade: TradeLog) -> Self {
        NotificationEvent::NewTrade { trade }
    }
}

/// First frame a listener must send; everything else it sends is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Auth {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

type ListenerSender = mpsc::UnboundedSender<Message>;

/// Registry of connected listeners keyed by user. Broadcast serializes once
/// and pushes to every live listener; listeners whose channel is gone are
/// pruned on the spot.
#[derive(Default)]
pub struct NotificationBus {
    listeners: RwLock<HashMap<String, Vec<ListenerSender>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, user_id: &str, sender: ListenerSender) {
        let mut listeners = self.listeners.write().await;
        listeners.entry(user_id.to_string()).or_default().push(sender);
        debug!("listener registered for {user_id}");
    }

    pub async fn broadcast(&self, user_id: &str, event: &NotificationEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                warn!("failed to serialize notification: {e}");
                return;
            }
        };
        let mut listeners = self.listeners.write().await;
        if let Some(senders) = listeners.get_mut(user_id) {
            senders.retain(|tx| tx.send(Message::Text(payload.clone())).is_ok());
            if senders.is_empty() {
                listeners.remove(user_id);
            }
        }
    }

    pub async fn listener_count(&self, user_id: &str) -> usize {
        self.listeners
            .read()
            .await
            .get(user_id)
            .map_or(0, |l| l.len())
    }

    /// Drops every registered listener; their forward tasks see the closed
    /// channel and hang up.
    pub async fn close_all(&self) {
        self.listeners.write().await.clear();
    }
}

/// Accept loop for the notification stream. Each connection must open with
/// `{"type":"auth","userId":…}`; unauthenticated connections receive nothing.
pub async fn run_ws_server(bus: std::sync::Arc<NotificationBus>, bind_addr: &str) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("cannot bind notification listener on {bind_addr}"))?;
    info!("notification stream listening on {bind_addr}");
    loop {
        let (stream, peer) = listener.accept().await?;
        let bus = bus.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_listener(bus, stream, peer).await {
                debug!("listener {peer} closed: {e:#}");
            }
        });
    }
}

async fn handle_listener(
    bus: std::sync::Arc<NotificationBus>,
    stream: TcpStream,
    peer: SocketAddr,
) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .context("websocket handshake failed")?;
    let (mut write, mut read) = ws.split();

    let first = read
        .next()
        .await
        .ok_or_else(|| anyhow!("connection closed before auth"))??;
    let ClientMessage::Auth { user_id } = serde_json::from_str(
        first
            .to_text()
            .context("auth frame must be text")?,
    )
    .context("first frame must be an auth message")?;
    info!("listener {peer} authenticated as {user_id}");

    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.register(&user_id, tx).await;

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(message) => write.send(message).await?,
                // Registry dropped us (shutdown); say goodbye.
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            inbound = read.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // post-auth frames are ignored
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_status() -> NotificationEvent {
        NotificationEvent::bot_status(Network::Bnb, true)
    }

    #[test]
    fn bot_status_wire_shape() {
        let rendered = serde_json::to_string(&sample_status()).unwrap();
        assert_eq!(
            rendered,
            r#"{"type":"bot_status","network":"BNB","isRunning":true}"#
        );
    }

    #[tokio::test]
    async fn broadcast_prunes_dead_listeners() {
        let bus = NotificationBus::new();
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        drop(dead_rx);
        bus.register("u1", live_tx).await;
        bus.register("u1", dead_tx).await;
        assert_eq!(bus.listener_count("u1").await, 2);

        bus.broadcast("u1", &sample_status()).await;
        assert_eq!(bus.listener_count("u1").await, 1);
        assert!(matches!(live_rx.recv().await, Some(Message::Text(_))));
    }

    #[tokio::test]
    async fn broadcast_to_unknown_user_is_a_no_op() {
        let bus = NotificationBus::new();
        bus.broadcast("nobody", &sample_status()).await;
        assert_eq!(bus.listener_count("nobody").await, 0);
    }

    #[tokio::test]
    async fn events_arrive_in_broadcast_order() {
        let bus = NotificationBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.register("u1", tx).await;
        bus.broadcast("u1", &NotificationEvent::bot_status(Network::Eth, true)).await;
        bus.broadcast("u1", &NotificationEvent::bot_status(Network::Eth, false)).await;
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(first.to_text().unwrap().contains("true"));
        assert!(second.to_text().unwrap().contains("false"));
    }
}
