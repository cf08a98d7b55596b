//! Server Configuration
//!
//! Layered with figment: built-in defaults, then `jigna.toml` (or the file
//! given on the command line), then `JIGNA_` environment variables with `__`
//! separating nested keys (`JIGNA_SERVER__PORT=8080`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Configuration file read when none is given
pub const DEFAULT_CONFIG_FILE: &str = "jigna.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid listen address {0}")]
    Address(String),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9600,
        }
    }
}

/// Document served at `/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub head_html: String,
    /// Demo body when empty
    #[serde(default)]
    pub body_html: String,
    pub resources_root: PathBuf,
    pub resources_prefix: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            head_html: String::new(),
            body_html: String::new(),
            resources_root: PathBuf::from("resources"),
            resources_prefix: "/resources".to_string(),
        }
    }
}

/// Log filter used when `RUST_LOG` is unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "jigna=info,tower_http=debug".to_string(),
        }
    }
}

impl Config {
    /// The provider stack, lowest precedence first
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("JIGNA_").split("__"))
    }

    /// Load the configuration; a missing file is not an error
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::figment(path).extract().map_err(|e| Box::new(e).into())
    }

    /// Address the server listens on
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::Address(addr))
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
