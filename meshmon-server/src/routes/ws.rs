//! Live-update WebSocket endpoint.
//!
//! The server only pushes. Anything the client sends is read and dropped;
//! it just keeps the connection alive. The socket is closed as soon as
//! either side ends, including when the hub prunes the subscriber.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tracing::debug;

use crate::hub::{BroadcastHub, SubscriberId};
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, rx) = state.hub.register();
    let (ws_sender, ws_receiver) = socket.split();
    relay(&state.hub, id, rx, ws_sender, ws_receiver).await;
}

/// Pump hub envelopes into `sink` while draining `stream`, until one ends
async fn relay<W, R, E>(
    hub: &BroadcastHub,
    id: SubscriberId,
    mut rx: mpsc::Receiver<String>,
    mut sink: W,
    mut stream: R,
) where
    W: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let outbound = async {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        debug!(%id, "Subscriber pruned by hub");
    };

    let inbound = async {
        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(%id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = outbound => {}
        _ = inbound => {}
    }

    let _ = sink.send(Message::Close(None)).await;
    hub.unregister(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::SUBSCRIBER_BUFFER;
    use futures::channel::mpsc as client;
    use meshmon_core::Event;
    use std::time::Duration;

    #[tokio::test]
    async fn test_pruned_subscriber_socket_is_closed() {
        let hub = BroadcastHub::new();
        let (id, rx) = hub.register();
        let (sink, mut delivered) = client::unbounded::<Message>();
        let silent_client = futures::stream::pending::<Result<Message, std::io::Error>>();

        let relay_hub = hub.clone();
        let task = tokio::spawn(async move {
            relay(&relay_hub, id, rx, sink, silent_client).await;
        });

        // One more than the buffer holds, before the relay gets to run
        for _ in 0..=SUBSCRIBER_BUFFER {
            hub.broadcast(&Event::neighbors_updated());
        }
        assert!(!hub.is_registered(id));

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        let mut texts = 0;
        let mut last = None;
        while let Some(msg) = delivered.next().await {
            if matches!(msg, Message::Text(_)) {
                texts += 1;
            }
            last = Some(msg);
        }
        assert_eq!(texts, SUBSCRIBER_BUFFER);
        assert!(matches!(last, Some(Message::Close(_))));
    }

    #[tokio::test]
    async fn test_client_close_unregisters() {
        let hub = BroadcastHub::new();
        let (id, rx) = hub.register();
        let (sink, _delivered) = client::unbounded::<Message>();
        let closing_client = futures::stream::iter(vec![Ok::<_, std::io::Error>(Message::Close(None))]);

        tokio::time::timeout(
            Duration::from_secs(1),
            relay(&hub, id, rx, sink, closing_client),
        )
        .await
        .unwrap();

        assert!(!hub.is_registered(id));
        assert_eq!(hub.broadcast(&Event::neighbors_updated()), 0);
    }
}
