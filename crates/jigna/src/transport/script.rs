//! Transport for embedded script engines
//!
//! Web views and script hosts expose a single "evaluate this script" entry
//! point. Events are delivered by evaluating a call to the remote event
//! handler with the event JSON as its argument.

use super::{Transport, handler_invocation};

/// Evaluates a script on the remote side
pub type ScriptEvaluator = Box<dyn Fn(&str) + Send + Sync>;

/// Delivers events by script evaluation
pub struct ScriptTransport {
    evaluate: ScriptEvaluator,
}

impl ScriptTransport {
    pub fn new(evaluate: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            evaluate: Box::new(evaluate),
        }
    }
}

impl Transport for ScriptTransport {
    fn push(&self, payload: String) {
        let script = handler_invocation(&payload);
        tracing::trace!(len = script.len(), "Evaluating event handler");
        (self.evaluate)(&script);
    }
}
