//! Jigna - Object bridge between host models and a script UI
//!
//! This crate provides the session layer on top of `jigna_runtime`:
//! - The JSON `Bridge` and the `Transport` adapters it talks through
//! - The `View` document and its static resources
//! - The HTTP/WebSocket server and its configuration

// Re-export core crates
pub use jigna_runtime;
pub use jigna_types;

// JSON envelope handling
pub mod bridge;

// Outbound delivery (channel, script, websocket)
pub mod transport;

// Document and resources
pub mod resources;
pub mod view;

// HTTP/WebSocket server
pub mod config;
pub mod server;

// Demo models
pub mod demo;
