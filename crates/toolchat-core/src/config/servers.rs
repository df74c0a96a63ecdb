//! Tool server configuration
//!
//! The file maps a server identifier to the command that starts it:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "fs": {
//!       "command": "npx",
//!       "args": ["-y", "@modelcontextprotocol/server-filesystem", "/tmp"]
//!     }
//!   }
//! }
//! ```
//!
//! The same structure is accepted as YAML when the file ends in `.yaml`/`.yml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// Handshake timeout used when a server entry does not set one
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How to start one tool server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Executable to launch
    pub command: String,
    /// Arguments passed to the executable
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the child process
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Disabled servers are kept in the file but never started
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Handshake timeout in seconds
    #[serde(
        rename = "connectTimeoutSecs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub connect_timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    /// Create a server entry from a command and its arguments
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            enabled: true,
            connect_timeout_secs: None,
        }
    }

    /// Add an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the handshake timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Mark the server as disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Effective handshake timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }
}

/// All configured tool servers, keyed by server identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServersConfig {
    #[serde(rename = "mcpServers", default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

impl ServersConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location: `<config dir>/toolchat/servers.json`
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join("toolchat").join("servers.json")
    }

    /// Add or replace a server entry
    pub fn with_server(mut self, id: impl Into<String>, config: ServerConfig) -> Self {
        self.servers.insert(id.into(), config);
        self
    }

    /// Parse JSON text
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML text
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; the format follows the extension
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if is_yaml(path) {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Load from a file, or return an empty configuration if it does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save to a file; the format follows the extension
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = if is_yaml(path) {
            serde_yaml::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject entries that can never be started
    pub fn validate(&self) -> ConfigResult<()> {
        for (id, server) in &self.servers {
            if id.trim().is_empty() {
                return Err(ConfigError::Invalid("server identifier is empty".to_string()));
            }
            if server.command.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "server '{}' has no command",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Enabled servers in identifier order
    pub fn enabled_servers(&self) -> impl Iterator<Item = (&str, &ServerConfig)> {
        self.servers
            .iter()
            .filter(|(_, server)| server.enabled)
            .map(|(id, server)| (id.as_str(), server))
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}
