//! Jigna Runtime - Host side of the object bridge
//!
//! This crate holds the live-object model (`Model`, `ListModel`), change
//! observation, the per-session object registry, the marshaler and the
//! request broker. It knows nothing about how messages travel; transports
//! live in the `jigna` crate.

pub use jigna_types;

mod broker;
mod host;
mod marshal;
mod observe;
mod registry;

#[cfg(test)]
mod testutil;

pub use broker::*;
pub use host::*;
pub use marshal::*;
pub use observe::*;
pub use registry::*;
