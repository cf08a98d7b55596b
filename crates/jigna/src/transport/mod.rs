//! Transports
//!
//! A transport is the outbound half of a bridge session: it delivers encoded
//! events to the remote side. The inbound half is whoever owns the transport
//! calling [`Bridge::handle_request`](crate::bridge::Bridge::handle_request)
//! with each request string it receives.

mod channel;
mod script;
mod websocket;

pub use channel::*;
pub use script::*;
pub use websocket::*;

use jigna_types::Event;

/// Script function on the remote side that receives pushed events
pub const EVENT_HANDLER: &str = "jigna.bridge.handle_event";

/// Host to remote delivery of one message
pub trait Transport: Send + Sync {
    /// Deliver an encoded event; fire and forget
    fn push(&self, payload: String);

    /// Deliver an event, encoding it first
    fn push_event(&self, event: &Event) {
        match serde_json::to_string(event) {
            Ok(payload) => self.push(payload),
            Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
        }
    }
}

/// Script statement invoking the remote event handler with `payload`
///
/// The payload is embedded as a JSON string literal, so the handler receives
/// the event JSON verbatim as its only argument.
pub fn handler_invocation(payload: &str) -> String {
    let literal = serde_json::Value::String(payload.to_string());
    format!("{EVENT_HANDLER}({literal});")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_invocation_quotes_payload() {
        let payload = r#"{"kind":"object_changed","attribute_name":"it's"}"#;
        assert_eq!(
            handler_invocation(payload),
            r#"jigna.bridge.handle_event("{\"kind\":\"object_changed\",\"attribute_name\":\"it's\"}");"#
        );
    }
}
