//! Static resources for the document
//!
//! Serves files below a root directory, with canned responses for special
//! paths taking precedence over the filesystem.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Fallback content type for unknown extensions
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Extension to content type table, built on first use
fn content_types() -> &'static HashMap<&'static str, &'static str> {
    static TYPES: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TYPES.get_or_init(|| {
        HashMap::from([
            ("html", "text/html"),
            ("htm", "text/html"),
            ("css", "text/css"),
            ("js", "application/javascript"),
            ("mjs", "application/javascript"),
            ("json", "application/json"),
            ("map", "application/json"),
            ("txt", "text/plain"),
            ("svg", "image/svg+xml"),
            ("png", "image/png"),
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("gif", "image/gif"),
            ("ico", "image/x-icon"),
            ("woff", "font/woff"),
            ("woff2", "font/woff2"),
            ("ttf", "font/ttf"),
        ])
    })
}

/// Guess a content type from a path's extension
pub fn guess_type(path: &str) -> &'static str {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| content_types().get(ext.to_ascii_lowercase().as_str()).copied())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// A loaded resource
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Loads resources from a directory
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    root: PathBuf,
    overrides: HashMap<String, Vec<u8>>,
}

impl FileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overrides: HashMap::new(),
        }
    }

    /// Serve `body` for `path` instead of the file
    pub fn with_override(mut self, path: &str, body: impl Into<Vec<u8>>) -> Self {
        self.overrides
            .insert(path.trim_matches('/').to_string(), body.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the resource at a request path
    ///
    /// Returns `None` for missing files and for paths leaving the root.
    pub async fn load(&self, path: &str) -> Option<Resource> {
        let path = path.trim_matches('/');

        if let Some(body) = self.overrides.get(path) {
            return Some(Resource {
                content_type: guess_type(path),
                body: body.clone(),
            });
        }

        let relative = sanitize(path)?;
        match tokio::fs::read(self.root.join(&relative)).await {
            Ok(body) => Some(Resource {
                content_type: guess_type(path),
                body,
            }),
            Err(e) => {
                tracing::debug!(path = %relative.display(), error = %e, "Resource not found");
                None
            }
        }
    }
}

/// Relative path made only of normal components
fn sanitize(path: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn loader() -> (TempDir, FileLoader) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("js")).unwrap();
        std::fs::write(dir.path().join("js/jigna.js"), "var jigna = {};").unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let loader = FileLoader::new(dir.path());
        (dir, loader)
    }

    #[test]
    fn test_guess_type() {
        assert_eq!(guess_type("index.html"), "text/html");
        assert_eq!(guess_type("js/jigna.js"), "application/javascript");
        assert_eq!(guess_type("STYLE.CSS"), "text/css");
        assert_eq!(guess_type("blob.bin"), DEFAULT_CONTENT_TYPE);
        assert_eq!(guess_type("README"), DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_load_file() {
        let (_dir, loader) = loader();
        let resource = loader.load("/js/jigna.js").await.unwrap();
        assert_eq!(resource.content_type, "application/javascript");
        assert_eq!(resource.body, b"var jigna = {};");
    }

    #[tokio::test]
    async fn test_override_wins() {
        let (_dir, loader) = loader();
        let loader = loader.with_override("index.html", "<html>canned</html>");
        let resource = loader.load("index.html").await.unwrap();
        assert_eq!(resource.body, b"<html>canned</html>");
        assert_eq!(resource.content_type, "text/html");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (_dir, loader) = loader();
        assert!(loader.load("js/missing.js").await.is_none());
        assert!(loader.load("js").await.is_none());
        assert!(loader.load("").await.is_none());
    }

    #[tokio::test]
    async fn test_escaping_root_rejected() {
        let (dir, _) = loader();
        let loader = FileLoader::new(dir.path().join("js"));
        assert!(loader.load("../index.html").await.is_none());
        assert!(loader.load("js/../../index.html").await.is_none());
    }
}
