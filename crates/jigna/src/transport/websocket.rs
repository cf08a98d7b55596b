//! WebSocket transport
//!
//! Each text frame from the client is one request. Everything the server
//! sends is a tagged [`ServerFrame`] so responses, pushed events and protocol
//! errors can share the socket.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use ts_rs::TS;

use jigna_types::{Event, Response};

use super::Transport;
use crate::bridge::{Bridge, BridgeError};

/// Frames sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent once when the session opens
    Connected {
        session_id: String,
        server_version: String,
    },

    /// Response to the previous request
    Response { response: Response },

    /// Event pushed without a request
    Event { event: Event },

    /// The previous frame could not be handled
    Error { message: String },
}

impl ServerFrame {
    pub fn connected(session_id: impl Into<String>) -> Self {
        ServerFrame::Connected {
            session_id: session_id.into(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }
}

/// Pushes events as frames onto a socket's outbound queue
#[derive(Clone)]
pub struct WebSocketTransport {
    tx: mpsc::UnboundedSender<ServerFrame>,
}

impl WebSocketTransport {
    pub fn new(tx: mpsc::UnboundedSender<ServerFrame>) -> Self {
        Self { tx }
    }

    fn send(&self, frame: ServerFrame) {
        if self.tx.send(frame).is_err() {
            tracing::debug!("Socket closed, dropping event");
        }
    }
}

impl Transport for WebSocketTransport {
    fn push(&self, payload: String) {
        match serde_json::from_str(&payload) {
            Ok(event) => self.send(ServerFrame::Event { event }),
            Err(e) => tracing::warn!(error = %e, "Dropping undecodable event"),
        }
    }

    fn push_event(&self, event: &Event) {
        self.send(ServerFrame::Event {
            event: event.clone(),
        });
    }
}

/// Handle one inbound text frame, producing the frame to send back
pub fn respond(bridge: &Bridge, text: &str) -> ServerFrame {
    match bridge.handle_message(text) {
        Ok(response) => ServerFrame::Response { response },
        Err(err @ BridgeError::MalformedMessage(_)) => {
            tracing::warn!(error = %err, "Rejected client frame");
            ServerFrame::error(err.to_string())
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to handle client frame");
            ServerFrame::error(err.to_string())
        }
    }
}
