//! HTTP Server
//!
//! Serves the view's document and resources, and runs one bridge session per
//! WebSocket connection.

mod handler;
mod router;
mod state;

pub use handler::*;
pub use router::*;
pub use state::*;
