//! Controller Configuration
//!
//! Resolves where the Floodlight REST API lives and how long to wait for it.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults (`http://127.0.0.1:8080`, 30s request timeout)
//! 2. An environment file loaded with [`load_environment`]
//! 3. Process environment (`FLOODLIGHT_URL`, `FLOODLIGHT_HOST`, `FLOODLIGHT_PORT`, ...)
//! 4. A JSON or YAML file passed to [`ControllerConfig::load`]
//!
//! ```text
//! FLOODLIGHT_URL=http://10.0.0.254:8080
//! FLOODLIGHT_TIMEOUT_SECS=15
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default controller host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default REST API port of Floodlight
pub const DEFAULT_PORT: u16 = 8080;

/// Alternative environment file paths to check (in order of priority)
pub const ENV_FILE_PATHS: &[&str] = &["/etc/floodlight/environment", ".env"];

/// Controller connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Base URL of the REST API, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    format!("http://{}:{}", DEFAULT_HOST, DEFAULT_PORT)
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl ControllerConfig {
    /// Configuration pointing at the given controller address
    ///
    /// Accepts a full URL (`http://host:port`), `host:port` or a bare host,
    /// in which case the default port is used.
    pub fn for_controller(address: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(address)?,
            ..Self::default()
        })
    }

    /// Build configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = get_config_opt("FLOODLIGHT_URL") {
            config.base_url = normalize_base_url(&url)?;
        } else if let Some(host) = get_config_opt("FLOODLIGHT_HOST") {
            let port = get_config_opt("FLOODLIGHT_PORT")
                .map(|p| {
                    p.parse::<u16>()
                        .map_err(|_| Error::config(format!("invalid FLOODLIGHT_PORT: {}", p)))
                })
                .transpose()?
                .unwrap_or(DEFAULT_PORT);
            config.base_url = normalize_base_url(&format!("{}:{}", host, port))?;
        }

        config.timeout_secs = get_config_u64("FLOODLIGHT_TIMEOUT_SECS", config.timeout_secs);
        config.connect_timeout_secs =
            get_config_u64("FLOODLIGHT_CONNECT_TIMEOUT_SECS", config.connect_timeout_secs);

        debug!("Controller configuration from environment: {:?}", config);
        Ok(config)
    }

    /// Load configuration from a JSON or YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config from {}: {}", path.display(), e))
        })?;

        let is_yaml = path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false);

        let mut config: Self = if is_yaml {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::config(format!("failed to parse YAML config: {}", e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| Error::config(format!("failed to parse JSON config: {}", e)))?
        };
        config.base_url = normalize_base_url(&config.base_url)?;

        info!("Loaded controller config from {}", path.display());
        Ok(config)
    }
}

/// Normalize a controller address into a base URL
fn normalize_base_url(address: &str) -> Result<String> {
    let address = address.trim().trim_end_matches('/');
    if address.is_empty() {
        return Err(Error::config("controller address is empty"));
    }

    if address.starts_with("http://") || address.starts_with("https://") {
        return Ok(address.to_string());
    }
    if address.contains("://") {
        return Err(Error::config(format!(
            "unsupported scheme in controller address: {}",
            address
        )));
    }

    // Bare host gets the default REST port
    if address.contains(':') {
        Ok(format!("http://{}", address))
    } else {
        Ok(format!("http://{}:{}", address, DEFAULT_PORT))
    }
}

/// Load environment variables from the first environment file found.
///
/// `FLOODLIGHT_ENV_FILE` takes priority over [`ENV_FILE_PATHS`]. Existing
/// variables are never overridden. Returns the path that was loaded.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var("FLOODLIGHT_ENV_FILE") {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);
    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            for (key, value) in content.lines().filter_map(parse_env_line) {
                if std::env::var(&key).is_err() {
                    std::env::set_var(&key, &value);
                    loaded_count += 1;
                } else {
                    debug!("Skipped (already set): {}", key);
                }
            }
            info!("Loaded {} environment variables from {}", loaded_count, path);
            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

/// Parse a single `KEY=VALUE` line, skipping comments and blanks
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get an optional, non-empty configuration value.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_config_u64(key: &str, default: u64) -> u64 {
    match get_config_opt(key) {
        Some(v) => v.parse().unwrap_or_else(|_| {
            warn!("Ignoring non-numeric {}={}", key, v);
            default
        }),
        None => default,
    }
}
