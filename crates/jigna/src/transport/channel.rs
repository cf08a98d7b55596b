//! In-process transport over a tokio channel

use tokio::sync::mpsc;

use super::Transport;

/// Pushes encoded events into an unbounded channel
///
/// Useful for embedding the bridge in-process and for tests: the receiver
/// sees every event in the order it was pushed.
#[derive(Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Create a transport and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn push(&self, payload: String) {
        if self.tx.send(payload).is_err() {
            tracing::debug!("Event receiver closed, dropping event");
        }
    }
}
