//! Relay configuration
//!
//! Loaded once at startup and passed by value into the client, the gate, and
//! the drivers. Stored in `{config_dir}/cadrelay/config.json`; a missing or
//! unreadable file falls back to defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::envelope::Endpoint;
use crate::error::{Error, Result};

/// Default tool server base URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Default tool requested by the automated driver
pub const DEFAULT_TOOL_NAME: &str = "CreateSketch";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of script characters shown before confirmation
pub const DEFAULT_PREVIEW_LIMIT: usize = 4000;

/// Default interpreter operation budget per script
pub const DEFAULT_MAX_OPERATIONS: u64 = 1_000_000;

/// Process-wide relay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Tool server base URL, without the endpoint path
    pub server_url: String,
    /// Endpoint the automated driver posts to
    pub endpoint: Endpoint,
    /// Tool name for the automated driver
    pub tool_name: String,
    /// Parameters for the automated driver
    ///
    /// The default always carries `plane`, which `CreateSketch` requires.
    pub parameters: Map<String, Value>,
    /// Run received scripts without asking
    pub auto_execute: bool,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// Characters of script shown in the confirmation preview
    pub preview_limit: usize,
    /// Interpreter operation budget per script (0 = unlimited)
    pub max_operations: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let mut parameters = Map::new();
        parameters.insert("plane".to_string(), Value::String("xy".to_string()));

        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            endpoint: Endpoint::CallTool,
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            parameters,
            auto_execute: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            max_operations: DEFAULT_MAX_OPERATIONS,
        }
    }
}

impl RelayConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full URL of the configured endpoint
    pub fn endpoint_url(&self) -> String {
        endpoint_url(&self.server_url, self.endpoint)
    }

    /// Check values that would otherwise fail later at call time
    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(Error::Config("server_url must not be empty".to_string()));
        }
        if self.tool_name.trim().is_empty() {
            return Err(Error::Config("tool_name must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be positive".to_string()));
        }
        if self.preview_limit == 0 {
            return Err(Error::Config("preview_limit must be positive".to_string()));
        }
        Ok(())
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Join a server base URL and an endpoint path
pub fn endpoint_url(server_url: &str, endpoint: Endpoint) -> String {
    format!("{}{}", server_url.trim().trim_end_matches('/'), endpoint.path())
}

/// Get the path to the default config file
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cadrelay").join("config.json"))
}

/// Load configuration from `path` (or the default location), returning
/// defaults if the file doesn't exist or is invalid
pub fn load_config(path: Option<&Path>) -> RelayConfig {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_path) else {
        return RelayConfig::default();
    };

    if !path.exists() {
        return RelayConfig::default();
    }

    match RelayConfig::load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring config file {}: {}", path.display(), e);
            RelayConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_plane() {
        let config = RelayConfig::default();
        assert_eq!(config.parameters["plane"], "xy");
        assert_eq!(config.endpoint_url(), "http://127.0.0.1:8000/call_tool");
        assert!(!config.auto_execute);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_url_strips_trailing_slash() {
        assert_eq!(
            endpoint_url("http://host:9000/ ", Endpoint::CallTools),
            "http://host:9000/call_tools"
        );
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: RelayConfig =
            serde_json::from_str(r#"{"auto_execute": true, "endpoint": "/call_tools", "extra": 1}"#).unwrap();
        assert!(config.auto_execute);
        assert_eq!(config.endpoint, Endpoint::CallTools);
        assert_eq!(config.tool_name, DEFAULT_TOOL_NAME);
        assert_eq!(config.preview_limit, DEFAULT_PREVIEW_LIMIT);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = RelayConfig {
            server_url: "http://example.test:8001".to_string(),
            timeout_secs: 3,
            ..RelayConfig::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(load_config(Some(&path)), config);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        assert_eq!(load_config(Some(&path)), RelayConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = RelayConfig {
            timeout_secs: 0,
            ..RelayConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_preview() {
        let config = RelayConfig {
            preview_limit: 0,
            ..RelayConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("preview_limit")));
    }
}
