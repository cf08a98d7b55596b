//! Broker - dispatches bridge requests against registered objects
//!
//! The broker owns one session's registry and context. Requests are looked
//! up in the closed [`RequestKind`] table; arguments are decoded, the host
//! object is invoked and the result encoded. Failures of any kind come back
//! as data in the response, never as a panic or transport error.
//!
//! Objects introspected with `get_instance_info` are observed: each of their
//! attribute changes is pushed to the [`EventSink`] as one `object_changed`
//! event, synchronously from the mutation call site.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use serde::Serialize;

use jigna_types::{
    BrokerError, Event, InstanceInfo, ListInfo, ObjectId, Request, RequestKind, Response,
    WireValue,
};

use crate::host::{BASE_MEMBERS, HostError, HostValue, ListModel, Model, is_private_name};
use crate::marshal::Marshaler;
use crate::observe::{AttributeChange, ChangeKind, SubscriptionId};
use crate::registry::{ObjectRegistry, RegisteredObject};

/// Outbound channel for events pushed to the remote side
pub trait EventSink: Send + Sync {
    fn send_event(&self, event: Event);
}

/// Whether introspection and dispatch expose `name` on `model`
pub fn is_exposed(model: &dyn Model, name: &str) -> bool {
    !is_private_name(name)
        && !BASE_MEMBERS.contains(&name)
        && !model.ignored_members().contains(&name)
}

/// Describe a model for the remote side
pub fn instance_info(model: &dyn Model) -> InstanceInfo {
    InstanceInfo {
        type_name: model.type_name().to_string(),
        attribute_names: model
            .attribute_names()
            .into_iter()
            .filter(|name| is_exposed(model, name))
            .collect(),
        method_names: model
            .method_names()
            .into_iter()
            .filter(|name| is_exposed(model, name))
            .collect(),
    }
}

/// Map a possibly negative wire index onto `0..len`
pub fn resolve_index(index: i64, len: usize) -> Result<usize, HostError> {
    let resolved = if index < 0 { len as i64 + index } else { index };
    if (0..len as i64).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(HostError::IndexOutOfRange { index, len })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Broker
// ─────────────────────────────────────────────────────────────────────────────

/// Request dispatcher for one bridge session
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    marshaler: Marshaler,
    context: RwLock<BTreeMap<String, WireValue>>,
    sink: Arc<dyn EventSink>,
    subscriptions: DashMap<ObjectId, SubscriptionId>,
}

impl Broker {
    /// Create a broker with an empty registry and context
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                marshaler: Marshaler::new(ObjectRegistry::new_shared()),
                context: RwLock::new(BTreeMap::new()),
                sink,
                subscriptions: DashMap::new(),
            }),
        }
    }

    /// Create a broker whose context holds the given named values
    pub fn with_context<I, K>(sink: Arc<dyn EventSink>, context: I) -> Self
    where
        I: IntoIterator<Item = (K, HostValue)>,
        K: Into<String>,
    {
        let broker = Self::new(sink);
        for (name, value) in context {
            broker.set_context(name, &value);
        }
        broker
    }

    /// Add a root to the context, registering it
    pub fn set_context(&self, name: impl Into<String>, value: &HostValue) {
        let wire = self.inner.marshaler.encode(value);
        self.inner.context.write().insert(name.into(), wire);
    }

    /// The context as the remote side sees it
    pub fn context(&self) -> BTreeMap<String, WireValue> {
        self.inner.context.read().clone()
    }

    /// Register a value so the remote side can refer to it
    pub fn register_object(&self, value: &HostValue) -> Option<ObjectId> {
        self.inner.marshaler.registry().register_value(value)
    }

    /// This session's registry
    pub fn registry(&self) -> &Arc<ObjectRegistry> {
        self.inner.marshaler.registry()
    }

    /// This session's marshaler
    pub fn marshaler(&self) -> &Marshaler {
        &self.inner.marshaler
    }

    /// Number of objects currently observed
    pub fn subscription_count(&self) -> usize {
        self.inner.subscriptions.len()
    }

    /// Push an event to the remote side
    pub fn send_event(&self, event: Event) {
        self.inner.sink.send_event(event);
    }

    /// Handle a decoded request; never fails
    pub fn handle_request(&self, request: &Request) -> Response {
        match self.dispatch(request) {
            Ok(result) => Response::success(self.inner.marshaler.encode(&result)),
            Err(err) => {
                tracing::warn!(kind = %request.kind, error = %err, "Request failed");
                Response::failure(&err)
            }
        }
    }

    fn dispatch(&self, request: &Request) -> Result<HostValue, BrokerError> {
        let kind: RequestKind = request.kind.parse()?;
        let args = Args::new(kind, self.inner.marshaler.decode_all(&request.args)?);
        tracing::debug!(kind = %kind, args = args.values.len(), "Dispatching request");

        match kind {
            RequestKind::GetContext => {
                args.exactly(0)?;
                to_data(&*self.inner.context.read())
            }

            RequestKind::CallInstanceMethod => {
                let obj = args.instance(0)?;
                let method = args.member(1, &*obj)?;
                let rest = args.rest(2);
                Ok(obj.call_method(&method, rest)?)
            }

            RequestKind::GetInstanceAttribute => {
                args.exactly(2)?;
                let obj = args.instance(0)?;
                let name = args.member(1, &*obj)?;
                Ok(obj.get_attribute(&name)?)
            }

            RequestKind::SetInstanceAttribute => {
                args.exactly(3)?;
                let obj = args.instance(0)?;
                let name = args.member(1, &*obj)?;
                obj.set_attribute(&name, args.value(2)?)?;
                Ok(HostValue::Null)
            }

            RequestKind::GetInstanceInfo => {
                args.exactly(1)?;
                let obj = args.instance(0)?;
                self.observe(&obj);
                to_data(&instance_info(&*obj))
            }

            RequestKind::GetListInfo => {
                args.exactly(1)?;
                let list = args.list(0)?;
                to_data(&ListInfo { length: list.len() })
            }

            RequestKind::GetListItem => {
                args.exactly(2)?;
                let list = args.list(0)?;
                let index = resolve_index(args.index(1)?, list.len())?;
                Ok(list.get_item(index)?)
            }

            RequestKind::SetListItem => {
                args.exactly(3)?;
                let list = args.list(0)?;
                let index = resolve_index(args.index(1)?, list.len())?;
                list.set_item(index, args.value(2)?)?;
                Ok(HostValue::Null)
            }
        }
    }

    /// Subscribe to an object's changes, at most once per session
    fn observe(&self, model: &Arc<dyn Model>) {
        let Some(observable) = model.observable() else {
            return;
        };
        let id = RegisteredObject::Instance(model.clone()).id();

        if let Entry::Vacant(slot) = self.inner.subscriptions.entry(id.clone()) {
            let weak: Weak<BrokerInner> = Arc::downgrade(&self.inner);
            let subscription = observable.subscribe(Arc::new(move |change: &AttributeChange| {
                if let Some(inner) = weak.upgrade() {
                    inner.object_changed(&id, change);
                }
            }));
            slot.insert(subscription);
            tracing::debug!(type_name = %model.type_name(), "Observing object");
        }
    }
}

impl BrokerInner {
    fn object_changed(&self, id: &ObjectId, change: &AttributeChange) {
        let (attribute_name, new) = match &change.kind {
            // Re-send the whole collection rather than the delta.
            ChangeKind::Items { .. } => {
                let name = change.base_name();
                let current = self
                    .marshaler
                    .registry()
                    .resolve_instance(id)
                    .and_then(|model| model.get_attribute(name).map_err(Into::into));
                match current {
                    Ok(value) => (name.to_string(), value),
                    Err(err) => {
                        tracing::warn!(obj = %id, attribute = name, error = %err, "Failed to read changed collection");
                        return;
                    }
                }
            }
            ChangeKind::Replaced { new, .. } => (change.name.clone(), new.clone()),
        };

        let new_obj = self.marshaler.encode(&new);
        tracing::debug!(obj = %id, attribute = %attribute_name, "Object changed");
        self.sink
            .send_event(Event::object_changed(id.clone(), attribute_name, new_obj));
    }
}

impl Drop for BrokerInner {
    fn drop(&mut self) {
        let registry = self.marshaler.registry();
        for entry in self.subscriptions.iter() {
            if let Ok(model) = registry.resolve_instance(entry.key()) {
                if let Some(observable) = model.observable() {
                    observable.unsubscribe(*entry.value());
                }
            }
        }
    }
}

fn to_data<T: Serialize>(value: &T) -> Result<HostValue, BrokerError> {
    serde_json::to_value(value)
        .map(HostValue::Data)
        .map_err(|e| BrokerError::HostInvocationFailure {
            kind: "Serialization".to_string(),
            message: e.to_string(),
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument Access
// ─────────────────────────────────────────────────────────────────────────────

struct Args {
    kind: RequestKind,
    values: Vec<HostValue>,
}

impl Args {
    fn new(kind: RequestKind, values: Vec<HostValue>) -> Self {
        Self { kind, values }
    }

    fn invalid(&self, message: impl Into<String>) -> BrokerError {
        BrokerError::invalid_arguments(self.kind, message)
    }

    fn exactly(&self, count: usize) -> Result<(), BrokerError> {
        if self.values.len() == count {
            Ok(())
        } else {
            Err(self.invalid(format!(
                "expected {count} argument(s), got {}",
                self.values.len()
            )))
        }
    }

    fn get(&self, position: usize) -> Result<&HostValue, BrokerError> {
        self.values
            .get(position)
            .ok_or_else(|| self.invalid(format!("missing argument {position}")))
    }

    fn value(&self, position: usize) -> Result<HostValue, BrokerError> {
        self.get(position).cloned()
    }

    fn instance(&self, position: usize) -> Result<Arc<dyn Model>, BrokerError> {
        match self.get(position)? {
            HostValue::Instance(model) => Ok(model.clone()),
            other => Err(self.invalid(format!(
                "argument {position} must be an instance, got {}",
                other.type_name()
            ))),
        }
    }

    fn list(&self, position: usize) -> Result<Arc<dyn ListModel>, BrokerError> {
        match self.get(position)? {
            HostValue::List(list) => Ok(list.clone()),
            other => Err(self.invalid(format!(
                "argument {position} must be a list, got {}",
                other.type_name()
            ))),
        }
    }

    fn index(&self, position: usize) -> Result<i64, BrokerError> {
        let value = self.get(position)?;
        value.as_i64().ok_or_else(|| {
            self.invalid(format!(
                "argument {position} must be an integer index, got {}",
                value.type_name()
            ))
        })
    }

    /// A member name that the model exposes
    fn member(&self, position: usize, model: &dyn Model) -> Result<String, BrokerError> {
        let name = match self.get(position)? {
            HostValue::String(name) => name.clone(),
            other => {
                return Err(self.invalid(format!(
                    "argument {position} must be a member name, got {}",
                    other.type_name()
                )));
            }
        };
        if is_exposed(model, &name) {
            Ok(name)
        } else {
            Err(match self.kind {
                RequestKind::CallInstanceMethod => {
                    HostError::no_such_method(model.type_name(), &name)
                }
                _ => HostError::no_such_attribute(model.type_name(), &name),
            }
            .into())
        }
    }

    fn rest(&self, from: usize) -> Vec<HostValue> {
        self.values.iter().skip(from).cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
