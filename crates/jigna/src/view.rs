//! View - the HTML document and the sessions bound to it
//!
//! A view owns the named context values shown by its document. Each session
//! opened on the view gets a fresh broker and registry, and shares the same
//! live models with every other session.

use std::sync::Arc;

use jigna_runtime::HostValue;

use crate::bridge::Bridge;
use crate::config::ViewConfig;
use crate::transport::Transport;

/// Document skeleton; `{resources}`, `{head_html}` and `{body_html}` are substituted
pub const DOCUMENT_TEMPLATE: &str = r#"<html ng-app>
  <head>
    <script type="text/javascript" src="{resources}/js/jquery.min.js"></script>
    <script type="text/javascript" src="{resources}/js/angular.min.js"></script>
    <script type="text/javascript" src="{resources}/js/jigna.js"></script>

    {head_html}

  </head>

  <body>
    {body_html}
  </body>
</html>
"#;

/// Factory for bridge sessions over one document
#[derive(Clone)]
pub struct View {
    head_html: String,
    body_html: String,
    resources_prefix: String,
    context: Vec<(String, HostValue)>,
}

impl Default for View {
    fn default() -> Self {
        Self {
            head_html: String::new(),
            body_html: String::new(),
            resources_prefix: "/resources".to_string(),
            context: Vec::new(),
        }
    }
}

impl View {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ViewConfig) -> Self {
        Self::new()
            .with_head_html(&config.head_html)
            .with_body_html(&config.body_html)
            .with_resources_prefix(&config.resources_prefix)
    }

    pub fn with_head_html(mut self, html: &str) -> Self {
        self.head_html = html.to_string();
        self
    }

    pub fn with_body_html(mut self, html: &str) -> Self {
        self.body_html = html.to_string();
        self
    }

    pub fn with_resources_prefix(mut self, prefix: &str) -> Self {
        self.resources_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Expose a value to the document under `name`, replacing any previous one
    pub fn with_context(mut self, name: impl Into<String>, value: HostValue) -> Self {
        let name = name.into();
        self.context.retain(|(existing, _)| *existing != name);
        self.context.push((name, value));
        self
    }

    /// Names of the context values, in insertion order
    pub fn context_names(&self) -> Vec<&str> {
        self.context.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn body_html(&self) -> &str {
        &self.body_html
    }

    /// The complete HTML document
    pub fn html(&self) -> String {
        DOCUMENT_TEMPLATE
            .replace("{resources}", &self.resources_prefix)
            .replace("{head_html}", &self.head_html)
            .replace("{body_html}", &self.body_html)
    }

    /// Start a session whose events go out through `transport`
    pub fn open_session(&self, transport: Arc<dyn Transport>) -> Bridge {
        let bridge = Bridge::with_context(transport, self.context.iter().cloned());
        tracing::debug!(
            context = ?self.context_names(),
            "Opened bridge session"
        );
        bridge
    }
}
