//! Object Registry for objects exposed across the bridge
//!
//! Maps opaque identifiers to live host objects. An object's identifier is
//! the address of its shared allocation; because the registry keeps a strong
//! reference, that address cannot be reused while the mapping exists, so
//! registering the same object twice always yields the same identifier.
//!
//! There is no eviction: entries live as long as the registry, which lives
//! as long as its bridge session.

use std::sync::Arc;

use dashmap::DashMap;
use jigna_types::{BrokerError, ObjectId};

use crate::host::{HostValue, ListModel, Model, address_of};

// ─────────────────────────────────────────────────────────────────────────────
// Registered Objects
// ─────────────────────────────────────────────────────────────────────────────

/// A live object held by the registry
#[derive(Clone)]
pub enum RegisteredObject {
    Instance(Arc<dyn Model>),
    List(Arc<dyn ListModel>),
}

impl RegisteredObject {
    /// The identifier this object is registered under
    pub fn id(&self) -> ObjectId {
        match self {
            RegisteredObject::Instance(m) => ObjectId::from_address(address_of(m)),
            RegisteredObject::List(l) => ObjectId::from_address(address_of(l)),
        }
    }

    /// The registrable part of a host value
    pub fn from_value(value: &HostValue) -> Option<Self> {
        match value {
            HostValue::Instance(m) => Some(RegisteredObject::Instance(m.clone())),
            HostValue::List(l) => Some(RegisteredObject::List(l.clone())),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RegisteredObject::Instance(_) => "instance",
            RegisteredObject::List(_) => "list",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Object Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Identity-keyed table of exposed objects
///
/// Thread-safe; a registry can be shared between the dispatching thread and
/// change listeners running on whichever thread mutates a model.
#[derive(Default)]
pub struct ObjectRegistry {
    objects: DashMap<ObjectId, RegisteredObject>,
}

impl ObjectRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new registry wrapped in an Arc
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register an object, returning its identifier
    ///
    /// Idempotent: an object already present keeps its identifier.
    pub fn register(&self, object: &RegisteredObject) -> ObjectId {
        let id = object.id();
        self.objects
            .entry(id.clone())
            .or_insert_with(|| object.clone());
        id
    }

    /// Register a host value if it is a reference
    pub fn register_value(&self, value: &HostValue) -> Option<ObjectId> {
        RegisteredObject::from_value(value).map(|object| self.register(&object))
    }

    /// Look up an object by identifier
    pub fn resolve(&self, id: &ObjectId) -> Result<RegisteredObject, BrokerError> {
        self.objects
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| BrokerError::UnknownIdentifier(id.clone()))
    }

    /// Look up an object that must be an instance
    pub fn resolve_instance(&self, id: &ObjectId) -> Result<Arc<dyn Model>, BrokerError> {
        match self.resolve(id)? {
            RegisteredObject::Instance(m) => Ok(m),
            other => Err(BrokerError::HostInvocationFailure {
                kind: "TypeMismatch".to_string(),
                message: format!("object {id} is a {}, not an instance", other.kind()),
            }),
        }
    }

    /// Look up an object that must be a list
    pub fn resolve_list(&self, id: &ObjectId) -> Result<Arc<dyn ListModel>, BrokerError> {
        match self.resolve(id)? {
            RegisteredObject::List(l) => Ok(l),
            other => Err(BrokerError::HostInvocationFailure {
                kind: "TypeMismatch".to_string(),
                message: format!("object {id} is an {}, not a list", other.kind()),
            }),
        }
    }

    /// Check if an identifier is registered
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Get the number of registered objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
