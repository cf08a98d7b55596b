//! Marshaled values as they travel on the wire
//!
//! A value crossing the bridge is either carried inline (`primitive`) or
//! refers to a live host object by its registry identifier (`instance` /
//! `list`). The remote side uses the tag to decide which proxy to build.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ─────────────────────────────────────────────────────────────────────────────
// Object Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque identifier of a host object exposed across the bridge
///
/// Serialized as a bare JSON string. Identifiers are derived from the
/// address of the shared allocation, so the same object always maps to the
/// same identifier for as long as the registry holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ObjectId(pub String);

impl ObjectId {
    /// Create an identifier from an allocation address
    pub fn from_address(address: usize) -> Self {
        Self(address.to_string())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Value
// ─────────────────────────────────────────────────────────────────────────────

/// A marshaled value: `{"type": "primitive" | "instance" | "list", "value": ...}`
///
/// Every `instance`/`list` identifier must name an object present in the
/// host registry when the value is decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum WireValue {
    /// Numbers, booleans, strings, null and plain records, carried inline
    Primitive(serde_json::Value),
    /// Reference to a registered host instance
    Instance(ObjectId),
    /// Reference to a registered host sequence
    List(ObjectId),
}

impl Default for WireValue {
    fn default() -> Self {
        WireValue::Primitive(serde_json::Value::Null)
    }
}

impl WireValue {
    /// Create an inline primitive
    pub fn primitive(value: impl Into<serde_json::Value>) -> Self {
        WireValue::Primitive(value.into())
    }

    /// The marshaled form of null
    pub fn null() -> Self {
        WireValue::Primitive(serde_json::Value::Null)
    }

    /// Create an instance reference
    pub fn instance(id: impl Into<ObjectId>) -> Self {
        WireValue::Instance(id.into())
    }

    /// Create a list reference
    pub fn list(id: impl Into<ObjectId>) -> Self {
        WireValue::List(id.into())
    }

    /// The referenced object, if this is not a primitive
    pub fn object_id(&self) -> Option<&ObjectId> {
        match self {
            WireValue::Primitive(_) => None,
            WireValue::Instance(id) | WireValue::List(id) => Some(id),
        }
    }

    /// The inline JSON, if this is a primitive
    pub fn as_primitive(&self) -> Option<&serde_json::Value> {
        match self {
            WireValue::Primitive(v) => Some(v),
            _ => None,
        }
    }

    /// The wire tag of this value
    pub fn tag(&self) -> &'static str {
        match self {
            WireValue::Primitive(_) => "primitive",
            WireValue::Instance(_) => "instance",
            WireValue::List(_) => "list",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
