//! Server Application State
//!
//! Shared state accessible by all HTTP and WebSocket handlers.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::bridge::Bridge;
use crate::resources::FileLoader;
use crate::transport::Transport;
use crate::view::View;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Document and context served to every session
    view: View,

    /// Static files under the resources prefix
    resources: FileLoader,

    /// Open bridge sessions
    sessions: DashMap<Uuid, Bridge>,
}

impl AppState {
    /// Create new application state
    pub fn new(view: View, resources: FileLoader) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                view,
                resources,
                sessions: DashMap::new(),
            }),
        }
    }

    pub fn view(&self) -> &View {
        &self.inner.view
    }

    pub fn resources(&self) -> &FileLoader {
        &self.inner.resources
    }

    /// Open a bridge session and track it
    pub fn open_session(&self, transport: Arc<dyn Transport>) -> (Uuid, Bridge) {
        let session_id = Uuid::new_v4();
        let bridge = self.inner.view.open_session(transport);
        self.inner.sessions.insert(session_id, bridge.clone());
        tracing::info!(%session_id, "Session opened");
        (session_id, bridge)
    }

    /// Stop tracking a session
    pub fn close_session(&self, session_id: Uuid) {
        if self.inner.sessions.remove(&session_id).is_some() {
            tracing::info!(%session_id, "Session closed");
        }
    }

    /// Look up an open session
    pub fn session(&self, session_id: Uuid) -> Option<Bridge> {
        self.inner.sessions.get(&session_id).map(|s| s.value().clone())
    }

    /// Get the number of open sessions
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}
