//! Bridge - JSON envelope handling for one session
//!
//! Decodes request strings, hands them to the session's broker and encodes
//! the response. Events raised by the broker are encoded and pushed through
//! the session's transport.

use std::sync::Arc;

use parking_lot::ReentrantMutex;

use jigna_runtime::{Broker, EventSink, HostValue};
use jigna_types::{Event, Request, Response};

use crate::transport::Transport;

/// Failures at the JSON boundary
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The inbound message is not a request; there is nothing to respond to
    #[error("malformed message: {0}")]
    MalformedMessage(#[source] serde_json::Error),

    #[error("failed to encode message: {0}")]
    Encoding(#[source] serde_json::Error),
}

/// Routes broker events to a transport
struct TransportSink {
    transport: Arc<dyn Transport>,
}

impl EventSink for TransportSink {
    fn send_event(&self, event: Event) {
        self.transport.push_event(&event);
    }
}

/// One bridge session
///
/// Clones share the session. The session ends, and its change subscriptions
/// are released, when the last clone is dropped.
#[derive(Clone)]
pub struct Bridge {
    broker: Broker,
    transport: Arc<dyn Transport>,
    dispatch: Arc<ReentrantMutex<()>>,
}

impl Bridge {
    /// Create a session with an empty context
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_context(transport, std::iter::empty::<(String, HostValue)>())
    }

    /// Create a session whose context holds the given named values
    pub fn with_context<I, K>(transport: Arc<dyn Transport>, context: I) -> Self
    where
        I: IntoIterator<Item = (K, HostValue)>,
        K: Into<String>,
    {
        let sink = Arc::new(TransportSink {
            transport: transport.clone(),
        });
        Self {
            broker: Broker::with_context(sink, context),
            transport,
            dispatch: Arc::new(ReentrantMutex::new(())),
        }
    }

    /// The session's broker
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Decode and dispatch one request
    ///
    /// Requests of one session are handled one at a time, in arrival order.
    /// A request made from inside an event push on the dispatching thread
    /// runs nested in the outer one.
    pub fn handle_message(&self, message: &str) -> Result<Response, BridgeError> {
        let request: Request =
            serde_json::from_str(message).map_err(BridgeError::MalformedMessage)?;
        let _guard = self.dispatch.lock();
        Ok(self.broker.handle_request(&request))
    }

    /// Handle one request string, returning the response string
    pub fn handle_request(&self, message: &str) -> Result<String, BridgeError> {
        let response = self.handle_message(message)?;
        serde_json::to_string(&response).map_err(BridgeError::Encoding)
    }

    /// Push an event to the remote side
    pub fn send_event(&self, event: &Event) {
        self.transport.push_event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::Person;
    use crate::transport::{ChannelTransport, ScriptTransport};
    use parking_lot::Mutex;
    use jigna_types::{ObjectId, WireValue};
    use serde_json::{Value, json};

    fn session(person: &Arc<Person>) -> (Bridge, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let (transport, rx) = ChannelTransport::new();
        let bridge = Bridge::with_context(
            Arc::new(transport),
            [("model", HostValue::instance(person.clone()))],
        );
        (bridge, rx)
    }

    fn call(bridge: &Bridge, request: Value) -> Value {
        let response = bridge.handle_request(&request.to_string()).unwrap();
        serde_json::from_str(&response).unwrap()
    }

    fn model_id(bridge: &Bridge) -> String {
        let context = call(bridge, json!({"kind": "get_context", "args": []}));
        context["result"]["value"]["model"]["value"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_bootstrap_context() {
        let person = Person::shared("Ada", 36);
        let (bridge, _rx) = session(&person);

        let response = call(&bridge, json!({"kind": "get_context"}));
        let id = model_id(&bridge);
        assert_eq!(
            response,
            json!({
                "exception": null,
                "result": {"type": "primitive", "value": {"model": {"type": "instance", "value": id}}}
            })
        );
    }

    #[test]
    fn test_method_call_scenario() {
        let person = Person::shared("Ada", 36);
        let (bridge, _rx) = session(&person);
        let id = model_id(&bridge);

        let response = call(
            &bridge,
            json!({"kind": "call_instance_method", "args": [
                {"type": "instance", "value": id},
                {"type": "primitive", "value": "greet"},
                {"type": "primitive", "value": "World"}
            ]}),
        );
        assert_eq!(
            response,
            json!({"exception": null, "result": {"type": "primitive", "value": "Hello, World"}})
        );
    }

    #[test]
    fn test_write_then_read_back() {
        let person = Person::shared("Ada", 36);
        let (bridge, _rx) = session(&person);
        let id = model_id(&bridge);
        let obj = json!({"type": "instance", "value": id});

        call(
            &bridge,
            json!({"kind": "set_instance_attribute", "args": [
                obj, {"type": "primitive", "value": "age"}, {"type": "primitive", "value": 5}
            ]}),
        );
        let response = call(
            &bridge,
            json!({"kind": "get_instance_attribute", "args": [
                obj, {"type": "primitive", "value": "age"}
            ]}),
        );
        assert_eq!(response["result"], json!({"type": "primitive", "value": 5}));
    }

    #[test]
    fn test_birthday_overflow_is_exception() {
        let person = Person::shared("Ada", 36);
        let (bridge, _rx) = session(&person);
        let id = model_id(&bridge);
        let obj = json!({"type": "instance", "value": id});

        call(
            &bridge,
            json!({"kind": "set_instance_attribute", "args": [
                obj, {"type": "primitive", "value": "age"}, {"type": "primitive", "value": i64::MAX}
            ]}),
        );
        let response = call(
            &bridge,
            json!({"kind": "call_instance_method", "args": [
                obj, {"type": "primitive", "value": "birthday"}
            ]}),
        );
        assert_eq!(response["exception"], json!("Failed"));
        assert_eq!(person.age(), i64::MAX);
    }

    #[test]
    fn test_unknown_id_is_exception() {
        let person = Person::shared("Ada", 36);
        let (bridge, _rx) = session(&person);

        let response = call(
            &bridge,
            json!({"kind": "get_instance_attribute", "args": [
                {"type": "instance", "value": "1"}, {"type": "primitive", "value": "age"}
            ]}),
        );
        assert_eq!(response["exception"], json!("UnknownIdentifier"));
        assert!(response["result"]["value"].is_string());
    }

    #[test]
    fn test_malformed_message() {
        let person = Person::shared("Ada", 36);
        let (bridge, _rx) = session(&person);

        for message in ["not json", r#"{"args": []}"#, r#"{"kind": "get_context", "args": [{"type": "tuple"}]}"#] {
            let err = bridge.handle_request(message).unwrap_err();
            assert!(matches!(err, BridgeError::MalformedMessage(_)), "{message}");
        }
    }

    #[test]
    fn test_change_event_reaches_transport() {
        let person = Person::shared("Ada", 36);
        let (bridge, mut rx) = session(&person);
        let id = model_id(&bridge);

        call(
            &bridge,
            json!({"kind": "get_instance_info", "args": [{"type": "instance", "value": id}]}),
        );
        call(
            &bridge,
            json!({"kind": "call_instance_method", "args": [
                {"type": "instance", "value": id}, {"type": "primitive", "value": "birthday"}
            ]}),
        );

        let event: Event = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(
            event,
            Event::object_changed(ObjectId::from(id), "age", WireValue::primitive(37))
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sessions_do_not_share_subscriptions() {
        let person = Person::shared("Ada", 36);
        let (first, mut first_rx) = session(&person);
        let (second, mut second_rx) = session(&person);

        let id = model_id(&first);
        call(
            &first,
            json!({"kind": "get_instance_info", "args": [{"type": "instance", "value": id}]}),
        );
        model_id(&second);

        person.set_age(40);
        assert!(first_rx.try_recv().is_ok());
        assert!(second_rx.try_recv().is_err());
    }

    #[test]
    fn test_dropping_session_stops_events() {
        let person = Person::shared("Ada", 36);
        let (bridge, mut rx) = session(&person);
        let id = model_id(&bridge);
        call(
            &bridge,
            json!({"kind": "get_instance_info", "args": [{"type": "instance", "value": id}]}),
        );

        drop(bridge);
        person.set_age(40);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_event_pushes_json() {
        let person = Person::shared("Ada", 36);
        let (bridge, mut rx) = session(&person);
        let event = Event::object_changed(ObjectId::from("7"), "x", WireValue::null());

        bridge.send_event(&event);

        let pushed: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(pushed["kind"], json!("object_changed"));
        assert_eq!(pushed["obj"], json!("7"));
    }

    #[test]
    fn test_event_handler_can_call_back_during_dispatch() {
        let person = Person::shared("Ada", 36);
        let slot: Arc<Mutex<Option<Bridge>>> = Arc::new(Mutex::new(None));
        let replies = Arc::new(Mutex::new(Vec::new()));

        let (bridge_slot, seen) = (slot.clone(), replies.clone());
        let transport = ScriptTransport::new(move |_script| {
            let Some(bridge) = bridge_slot.lock().clone() else {
                return;
            };
            let reply = bridge
                .handle_request(&json!({"kind": "get_context"}).to_string())
                .unwrap();
            seen.lock().push(reply);
        });
        let bridge = Bridge::with_context(
            Arc::new(transport),
            [("model", HostValue::instance(person.clone()))],
        );
        *slot.lock() = Some(bridge.clone());

        let id = model_id(&bridge);
        call(
            &bridge,
            json!({"kind": "get_instance_info", "args": [{"type": "instance", "value": id}]}),
        );
        let response = call(
            &bridge,
            json!({"kind": "call_instance_method", "args": [
                {"type": "instance", "value": id}, {"type": "primitive", "value": "birthday"}
            ]}),
        );

        assert_eq!(response["result"], json!({"type": "primitive", "value": 37}));
        let replies = replies.lock();
        assert_eq!(replies.len(), 1);
        let nested: Value = serde_json::from_str(&replies[0]).unwrap();
        assert_eq!(nested["exception"], Value::Null);

        // Break the bridge -> transport -> bridge cycle.
        slot.lock().take();
    }
}
