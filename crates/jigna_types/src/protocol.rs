//! Bridge Protocol Messages
//!
//! Defines the request, response and event envelopes exchanged between the
//! remote script side and the host broker. One JSON document per message.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{BrokerError, ObjectId, WireValue};

/// The closed set of operations the broker will perform
///
/// Extending the protocol means widening this enum; client supplied names are
/// never resolved against host members directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    GetContext,
    CallInstanceMethod,
    GetInstanceAttribute,
    SetInstanceAttribute,
    GetInstanceInfo,
    GetListInfo,
    GetListItem,
    SetListItem,
}

impl RequestKind {
    /// Every request kind, in table order
    pub const ALL: [RequestKind; 8] = [
        RequestKind::GetContext,
        RequestKind::CallInstanceMethod,
        RequestKind::GetInstanceAttribute,
        RequestKind::SetInstanceAttribute,
        RequestKind::GetInstanceInfo,
        RequestKind::GetListInfo,
        RequestKind::GetListItem,
        RequestKind::SetListItem,
    ];

    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::GetContext => "get_context",
            RequestKind::CallInstanceMethod => "call_instance_method",
            RequestKind::GetInstanceAttribute => "get_instance_attribute",
            RequestKind::SetInstanceAttribute => "set_instance_attribute",
            RequestKind::GetInstanceInfo => "get_instance_info",
            RequestKind::GetListInfo => "get_list_info",
            RequestKind::GetListItem => "get_list_item",
            RequestKind::SetListItem => "set_list_item",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestKind {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| BrokerError::UnknownRequestKind(s.to_string()))
    }
}

/// Request sent from the remote side
///
/// `kind` stays a plain string here so that an unknown kind is answered with
/// an exception rather than rejected as a malformed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Request {
    pub kind: String,
    #[serde(default)]
    pub args: Vec<WireValue>,
}

impl Request {
    /// Create a request for a known kind
    pub fn new(kind: RequestKind, args: Vec<WireValue>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            args,
        }
    }
}

/// Response returned for every request
///
/// A non-null `exception` means the call failed; `result` then holds the
/// failure message as a primitive string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Response {
    pub exception: Option<String>,
    pub result: WireValue,
}

impl Response {
    /// Create a success response
    pub fn success(result: WireValue) -> Self {
        Self {
            exception: None,
            result,
        }
    }

    /// Create a failure response from a broker error
    pub fn failure(error: &BrokerError) -> Self {
        Self {
            exception: Some(error.exception_name().to_string()),
            result: WireValue::primitive(error.to_string()),
        }
    }

    /// Whether the call failed
    pub fn is_exception(&self) -> bool {
        self.exception.is_some()
    }
}

/// Events pushed from the host without a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// An attribute of an observed object changed
    ObjectChanged {
        obj: ObjectId,
        attribute_name: String,
        new_obj: WireValue,
    },
}

impl Event {
    /// Create an object changed event
    pub fn object_changed(
        obj: ObjectId,
        attribute_name: impl Into<String>,
        new_obj: WireValue,
    ) -> Self {
        Event::ObjectChanged {
            obj,
            attribute_name: attribute_name.into(),
            new_obj,
        }
    }
}

/// Result of `get_instance_info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InstanceInfo {
    pub type_name: String,
    pub attribute_names: Vec<String>,
    pub method_names: Vec<String>,
}

/// Result of `get_list_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListInfo {
    pub length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_kind_names() {
        for kind in RequestKind::ALL {
            assert_eq!(kind.as_str().parse::<RequestKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                json!(kind.as_str())
            );
        }
    }

    #[test]
    fn test_unknown_request_kind() {
        let err = "__init__".parse::<RequestKind>().unwrap_err();
        assert!(matches!(err, BrokerError::UnknownRequestKind(ref k) if k == "__init__"));
    }

    #[test]
    fn test_request_parse() {
        let text = r#"{"kind":"call_instance_method","args":[{"type":"instance","value":"7"},{"type":"primitive","value":"greet"},{"type":"primitive","value":"World"}]}"#;
        let request: Request = serde_json::from_str(text).unwrap();
        assert_eq!(request.kind, "call_instance_method");
        assert_eq!(request.args.len(), 3);
        assert_eq!(request.args[0], WireValue::instance("7"));
    }

    #[test]
    fn test_request_without_args() {
        let request: Request = serde_json::from_str(r#"{"kind":"get_context"}"#).unwrap();
        assert!(request.args.is_empty());
    }

    #[test]
    fn test_success_response_serialize() {
        let response = Response::success(WireValue::primitive("Hello, World"));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"exception": null, "result": {"type": "primitive", "value": "Hello, World"}})
        );
    }

    #[test]
    fn test_failure_response_serialize() {
        let err = BrokerError::UnknownIdentifier(ObjectId::from("123"));
        let response = Response::failure(&err);
        assert!(response.is_exception());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["exception"], json!("UnknownIdentifier"));
        assert_eq!(json["result"]["type"], json!("primitive"));
        assert!(json["result"]["value"].as_str().unwrap().contains("123"));
    }

    #[test]
    fn test_event_serialize() {
        let event = Event::object_changed(ObjectId::from("5"), "x", WireValue::primitive(2));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "kind": "object_changed",
                "obj": "5",
                "attribute_name": "x",
                "new_obj": {"type": "primitive", "value": 2}
            })
        );
    }

    #[test]
    fn test_instance_info_serialize() {
        let info = InstanceInfo {
            type_name: "demo.Person".to_string(),
            attribute_names: vec!["name".to_string()],
            method_names: vec!["greet".to_string()],
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["type_name"], json!("demo.Person"));
        assert_eq!(json["method_names"], json!(["greet"]));
    }
}
