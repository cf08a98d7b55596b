//! Host-side values and the capabilities exposed objects implement
//!
//! `HostValue` is what flows through the broker on the host side. Scalars and
//! plain data are copied across the bridge; `Instance` and `List` are shared
//! references to live objects that the remote side proxies by identifier.

use std::sync::Arc;

use crate::observe::Observable;

// ─────────────────────────────────────────────────────────────────────────────
// Exposed Object Capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// Members every model carries through this trait itself.
///
/// These are never reported by introspection, whatever a model lists.
pub const BASE_MEMBERS: &[&str] = &[
    "type_name",
    "attribute_names",
    "method_names",
    "get_attribute",
    "set_attribute",
    "call_method",
    "ignored_members",
    "observable",
];

/// A host object with attributes and methods, exposed as an `instance`
///
/// Implementations use interior mutability: the same object is shared by the
/// registry, other models and the embedding application. Method lookup is an
/// explicit `match` on the name inside the implementation.
pub trait Model: Send + Sync + 'static {
    /// Qualified type name reported to the remote side (e.g. `demo.Person`)
    fn type_name(&self) -> &str;

    /// Names of readable attributes
    fn attribute_names(&self) -> Vec<String>;

    /// Names of callable methods
    fn method_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Read an attribute
    fn get_attribute(&self, name: &str) -> Result<HostValue, HostError>;

    /// Write an attribute
    fn set_attribute(&self, name: &str, value: HostValue) -> Result<(), HostError> {
        let _ = value;
        Err(HostError::read_only(self.type_name(), name))
    }

    /// Invoke a method with already decoded arguments
    fn call_method(&self, name: &str, args: Vec<HostValue>) -> Result<HostValue, HostError> {
        let _ = args;
        Err(HostError::no_such_method(self.type_name(), name))
    }

    /// Members this type declares as framework internal
    fn ignored_members(&self) -> &[&str] {
        &[]
    }

    /// Change notification capability, if the object supports it
    fn observable(&self) -> Option<&dyn Observable> {
        None
    }
}

/// An ordered host sequence, exposed as a `list`
pub trait ListModel: Send + Sync + 'static {
    /// Number of items
    fn len(&self) -> usize;

    /// Whether the sequence is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the item at `index`
    fn get_item(&self, index: usize) -> Result<HostValue, HostError>;

    /// Replace the item at `index`
    fn set_item(&self, index: usize, value: HostValue) -> Result<(), HostError>;
}

/// Whether a member name follows the private naming convention
pub fn is_private_name(name: &str) -> bool {
    name.starts_with('_')
}

/// Address of a shared allocation, ignoring any trait object metadata
pub fn address_of<T: ?Sized>(arc: &Arc<T>) -> usize {
    Arc::as_ptr(arc) as *const () as usize
}

// ─────────────────────────────────────────────────────────────────────────────
// Host Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failures raised by host objects while being read, written or called
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("'{type_name}' object has no attribute '{name}'")]
    NoSuchAttribute { type_name: String, name: String },

    #[error("'{type_name}' object has no method '{name}'")]
    NoSuchMethod { type_name: String, name: String },

    #[error("attribute '{name}' of '{type_name}' is read-only")]
    ReadOnly { type_name: String, name: String },

    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{method}() takes {expected} argument(s) but {actual} were given")]
    Arity {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("{0}")]
    Failed(String),
}

impl HostError {
    pub fn no_such_attribute(type_name: &str, name: &str) -> Self {
        Self::NoSuchAttribute {
            type_name: type_name.to_string(),
            name: name.to_string(),
        }
    }

    pub fn no_such_method(type_name: &str, name: &str) -> Self {
        Self::NoSuchMethod {
            type_name: type_name.to_string(),
            name: name.to_string(),
        }
    }

    pub fn read_only(type_name: &str, name: &str) -> Self {
        Self::ReadOnly {
            type_name: type_name.to_string(),
            name: name.to_string(),
        }
    }

    /// Check a method's argument count
    pub fn check_arity(method: &str, args: &[HostValue], expected: usize) -> Result<(), Self> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(Self::Arity {
                method: method.to_string(),
                expected,
                actual: args.len(),
            })
        }
    }

    /// Type tag reported to the remote side
    pub fn kind(&self) -> &'static str {
        match self {
            HostError::NoSuchAttribute { .. } => "NoSuchAttribute",
            HostError::NoSuchMethod { .. } => "NoSuchMethod",
            HostError::ReadOnly { .. } => "ReadOnly",
            HostError::TypeMismatch { .. } => "TypeMismatch",
            HostError::Arity { .. } => "Arity",
            HostError::IndexOutOfRange { .. } => "IndexOutOfRange",
            HostError::Failed(_) => "Failed",
        }
    }
}

impl From<HostError> for jigna_types::BrokerError {
    fn from(err: HostError) -> Self {
        jigna_types::BrokerError::HostInvocationFailure {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host Value
// ─────────────────────────────────────────────────────────────────────────────

/// A value on the host side of the bridge
///
/// The variant is the classification: only `Instance` marshals as an
/// instance and only `List` as a list, everything else inline.
#[derive(Clone, Default)]
pub enum HostValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Plain structured data, copied across the bridge
    Data(serde_json::Value),
    /// Shared reference to an exposed object
    Instance(Arc<dyn Model>),
    /// Shared reference to an exposed sequence
    List(Arc<dyn ListModel>),
}

/// 2^63, the first float past the end of the i64 range
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl HostValue {
    /// Wrap a model
    pub fn instance<M: Model>(model: Arc<M>) -> Self {
        HostValue::Instance(model)
    }

    /// Wrap a list model
    pub fn list<L: ListModel>(list: Arc<L>) -> Self {
        HostValue::List(list)
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Whether this value refers to a live object
    pub fn is_reference(&self) -> bool {
        matches!(self, HostValue::Instance(_) | HostValue::List(_))
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 (also converts from float if lossless)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            HostValue::Float(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(f) => {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    /// Get as f64 (also converts from int)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Float(f) => Some(*f),
            HostValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a model reference
    pub fn as_instance(&self) -> Option<&Arc<dyn Model>> {
        match self {
            HostValue::Instance(m) => Some(m),
            _ => None,
        }
    }

    /// Get as a list reference
    pub fn as_list(&self) -> Option<&Arc<dyn ListModel>> {
        match self {
            HostValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Inline JSON for non-reference values
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            HostValue::Null => Some(serde_json::Value::Null),
            HostValue::Bool(b) => Some(serde_json::Value::Bool(*b)),
            HostValue::Int(i) => Some(serde_json::Value::Number((*i).into())),
            HostValue::Float(f) => Some(
                serde_json::Number::from_f64(*f)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            ),
            HostValue::String(s) => Some(serde_json::Value::String(s.clone())),
            HostValue::Data(v) => Some(v.clone()),
            HostValue::Instance(_) | HostValue::List(_) => None,
        }
    }

    /// Short name of the value's kind, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "bool",
            HostValue::Int(_) => "int",
            HostValue::Float(_) => "float",
            HostValue::String(_) => "string",
            HostValue::Data(_) => "data",
            HostValue::Instance(_) => "instance",
            HostValue::List(_) => "list",
        }
    }
}

impl std::fmt::Debug for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostValue::Null => write!(f, "Null"),
            HostValue::Bool(b) => write!(f, "Bool({b})"),
            HostValue::Int(i) => write!(f, "Int({i})"),
            HostValue::Float(x) => write!(f, "Float({x})"),
            HostValue::String(s) => write!(f, "String({s:?})"),
            HostValue::Data(v) => write!(f, "Data({v})"),
            HostValue::Instance(m) => {
                write!(f, "Instance({} @ {:#x})", m.type_name(), address_of(m))
            }
            HostValue::List(l) => write!(f, "List(len={} @ {:#x})", l.len(), address_of(l)),
        }
    }
}

/// Scalars and data compare by value, references by identity.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Int(a), HostValue::Int(b)) => a == b,
            (HostValue::Float(a), HostValue::Float(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Data(a), HostValue::Data(b)) => a == b,
            (HostValue::Instance(a), HostValue::Instance(b)) => address_of(a) == address_of(b),
            (HostValue::List(a), HostValue::List(b)) => address_of(a) == address_of(b),
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// From Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl From<()> for HostValue {
    fn from(_: ()) -> Self {
        HostValue::Null
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        HostValue::Bool(v)
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::Int(v as i64)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::Int(v)
    }
}

impl From<u32> for HostValue {
    fn from(v: u32) -> Self {
        HostValue::Int(v as i64)
    }
}

impl From<usize> for HostValue {
    fn from(v: usize) -> Self {
        HostValue::Int(v as i64)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Float(v)
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::String(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::String(v.to_string())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => HostValue::Null,
        }
    }
}

impl From<Arc<dyn Model>> for HostValue {
    fn from(m: Arc<dyn Model>) -> Self {
        HostValue::Instance(m)
    }
}

impl From<Arc<dyn ListModel>> for HostValue {
    fn from(l: Arc<dyn ListModel>) -> Self {
        HostValue::List(l)
    }
}

/// JSON arrays and objects arrive as plain data, never as references.
impl From<serde_json::Value> for HostValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => HostValue::Null,
            serde_json::Value::Bool(b) => HostValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    HostValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    HostValue::Float(f)
                } else {
                    HostValue::Data(serde_json::Value::Number(n))
                }
            }
            serde_json::Value::String(s) => HostValue::String(s),
            other => HostValue::Data(other),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TryFrom Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl TryFrom<HostValue> for bool {
    type Error = HostError;
    fn try_from(v: HostValue) -> Result<Self, Self::Error> {
        v.as_bool().ok_or(HostError::TypeMismatch {
            expected: "bool",
            actual: v.type_name(),
        })
    }
}

impl TryFrom<HostValue> for i64 {
    type Error = HostError;
    fn try_from(v: HostValue) -> Result<Self, Self::Error> {
        v.as_i64().ok_or(HostError::TypeMismatch {
            expected: "int",
            actual: v.type_name(),
        })
    }
}

impl TryFrom<HostValue> for f64 {
    type Error = HostError;
    fn try_from(v: HostValue) -> Result<Self, Self::Error> {
        v.as_f64().ok_or(HostError::TypeMismatch {
            expected: "float",
            actual: v.type_name(),
        })
    }
}

impl TryFrom<HostValue> for String {
    type Error = HostError;
    fn try_from(v: HostValue) -> Result<Self, Self::Error> {
        match v {
            HostValue::String(s) => Ok(s),
            _ => Err(HostError::TypeMismatch {
                expected: "string",
                actual: v.type_name(),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Counter;
    use serde_json::json;

    #[test]
    fn test_primitive_conversions() {
        assert_eq!(HostValue::from(42).as_i64(), Some(42));
        assert_eq!(HostValue::from(2.5).as_f64(), Some(2.5));
        assert_eq!(HostValue::from(true).as_bool(), Some(true));
        assert_eq!(HostValue::from("hello").as_str(), Some("hello"));
        assert!(HostValue::from(None::<i64>).is_null());
    }

    #[test]
    fn test_float_outside_i64_range_is_not_an_int() {
        assert_eq!(HostValue::Float(1e20).as_i64(), None);
        assert_eq!(HostValue::Float(-1e20).as_i64(), None);
        assert_eq!(HostValue::Float(9_223_372_036_854_775_808.0).as_i64(), None);
        assert_eq!(HostValue::Float(-9_223_372_036_854_775_808.0).as_i64(), Some(i64::MIN));
        assert_eq!(HostValue::Float(4.0).as_i64(), Some(4));
        assert!(i64::try_from(HostValue::Float(1e20)).is_err());
    }

    #[test]
    fn test_json_classification() {
        assert_eq!(HostValue::from(json!(5)), HostValue::Int(5));
        assert_eq!(HostValue::from(json!(1.5)), HostValue::Float(1.5));
        assert_eq!(HostValue::from(json!([1, 2])), HostValue::Data(json!([1, 2])));
        assert_eq!(
            HostValue::from(json!({"a": 1})),
            HostValue::Data(json!({"a": 1}))
        );
    }

    #[test]
    fn test_non_finite_float_encodes_null() {
        assert_eq!(HostValue::Float(f64::NAN).to_json(), Some(json!(null)));
    }

    #[test]
    fn test_reference_identity_equality() {
        let a = Counter::shared(1);
        let b = Counter::shared(1);
        assert_eq!(HostValue::instance(a.clone()), HostValue::instance(a.clone()));
        assert_ne!(HostValue::instance(a), HostValue::instance(b));
    }

    #[test]
    fn test_try_from_mismatch() {
        let err = i64::try_from(HostValue::from("x")).unwrap_err();
        assert_eq!(
            err,
            HostError::TypeMismatch {
                expected: "int",
                actual: "string"
            }
        );
        assert_eq!(err.kind(), "TypeMismatch");
    }

    #[test]
    fn test_arity_check() {
        let args = vec![HostValue::from(1)];
        assert!(HostError::check_arity("greet", &args, 1).is_ok());
        let err = HostError::check_arity("greet", &args, 2).unwrap_err();
        assert_eq!(err.to_string(), "greet() takes 2 argument(s) but 1 were given");
    }

    #[test]
    fn test_private_names() {
        assert!(is_private_name("_secret"));
        assert!(is_private_name("__dict__"));
        assert!(!is_private_name("name"));
    }
}
