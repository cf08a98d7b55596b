//! WebSocket Connection Handler
//!
//! Runs one bridge session per connection. Requests are dispatched on the
//! blocking pool, one at a time, so a slow host method only stalls its own
//! session.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::state::AppState;
use crate::bridge::Bridge;
use crate::transport::{ServerFrame, WebSocketTransport, respond};

/// Handle a WebSocket connection
pub async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Responses and pushed events share one outbound queue
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let transport = Arc::new(WebSocketTransport::new(tx.clone()));
    let (session_id, bridge) = state.open_session(transport);

    let _ = tx.send(ServerFrame::connected(session_id.to_string()));

    // Forward frames from the queue to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match serde_json::to_string(&frame) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to encode frame"),
            }
        }
    });

    // Process incoming requests in order
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let frame = dispatch(&bridge, text.to_string()).await;
                    if tx.send(frame).is_err() {
                        break;
                    }
                }
                Message::Close(_) => {
                    break;
                }
                Message::Ping(_) => {
                    // Pong is handled automatically by axum
                    tracing::trace!(%session_id, "Received ping");
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Cleanup
    state.close_session(session_id);
}

/// Handle one request off the async runtime
async fn dispatch(bridge: &Bridge, text: String) -> ServerFrame {
    let bridge = bridge.clone();
    match tokio::task::spawn_blocking(move || respond(&bridge, &text)).await {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!(error = %e, "Request handler panicked");
            ServerFrame::error("internal error")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::Person;
    use jigna_runtime::HostValue;

    #[tokio::test]
    async fn test_dispatch_on_blocking_pool() {
        let person = Person::shared("Ada", 36);
        let (tx, _rx) = mpsc::unbounded_channel();
        let bridge = Bridge::with_context(
            Arc::new(WebSocketTransport::new(tx)),
            [("person", HostValue::instance(person))],
        );

        let frame = dispatch(&bridge, r#"{"kind": "get_context"}"#.to_string()).await;
        assert!(matches!(frame, ServerFrame::Response { .. }));

        let frame = dispatch(&bridge, "not json".to_string()).await;
        assert!(matches!(frame, ServerFrame::Error { .. }));
    }
}
