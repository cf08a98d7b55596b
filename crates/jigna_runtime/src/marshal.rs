//! Conversion between host values and wire values
//!
//! Encoding registers every reference it meets, so anything the remote side
//! receives can be resolved again on a later request. Decoding resolves
//! references against the same registry and never creates objects.

use std::sync::Arc;

use jigna_types::{BrokerError, WireValue};

use crate::host::HostValue;
use crate::registry::{ObjectRegistry, RegisteredObject};

/// Marshals values for one bridge session
#[derive(Clone)]
pub struct Marshaler {
    registry: Arc<ObjectRegistry>,
}

impl Marshaler {
    pub fn new(registry: Arc<ObjectRegistry>) -> Self {
        Self { registry }
    }

    /// The registry references are minted in
    pub fn registry(&self) -> &Arc<ObjectRegistry> {
        &self.registry
    }

    /// Encode a host value, registering it if it is a reference
    pub fn encode(&self, value: &HostValue) -> WireValue {
        match value {
            HostValue::List(list) => {
                WireValue::List(self.registry.register(&RegisteredObject::List(list.clone())))
            }
            HostValue::Instance(model) => WireValue::Instance(
                self.registry
                    .register(&RegisteredObject::Instance(model.clone())),
            ),
            other => WireValue::Primitive(other.to_json().unwrap_or_default()),
        }
    }

    /// Encode every value in order
    pub fn encode_all<'a>(&self, values: impl IntoIterator<Item = &'a HostValue>) -> Vec<WireValue> {
        values.into_iter().map(|v| self.encode(v)).collect()
    }

    /// Decode a wire value, resolving references
    ///
    /// A reference must carry the tag of the object it names.
    pub fn decode(&self, wire: &WireValue) -> Result<HostValue, BrokerError> {
        match wire {
            WireValue::Primitive(json) => Ok(HostValue::from(json.clone())),
            WireValue::Instance(id) => Ok(HostValue::Instance(self.registry.resolve_instance(id)?)),
            WireValue::List(id) => Ok(HostValue::List(self.registry.resolve_list(id)?)),
        }
    }

    /// Decode every value, failing on the first unknown reference
    pub fn decode_all(&self, wires: &[WireValue]) -> Result<Vec<HostValue>, BrokerError> {
        wires.iter().map(|w| self.decode(w)).collect()
    }
}
