//! Jigna Types - Wire data model for the object bridge
//!
//! This crate contains the pure data structures exchanged between the host
//! (which owns live model objects) and the remote script side (which proxies
//! them). Everything here is plain serde data; the live objects themselves
//! live in `jigna_runtime`.
//!
//! TypeScript bindings for the remote side are generated with `ts-rs`.

mod error;
mod protocol;
mod value;

pub use error::*;
pub use protocol::*;
pub use value::*;
