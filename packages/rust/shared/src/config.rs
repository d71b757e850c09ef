//! Application configuration for SourceDock.
//!
//! User config lives at `~/.sourcedock/sourcedock.toml`.
//! Credentials are never stored in the file — only the names of the
//! environment variables that hold them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceDockError};
use crate::types::Protocol;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sourcedock.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sourcedock";

// ---------------------------------------------------------------------------
// Config structs (matching sourcedock.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Circuit breaker tuning.
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Domains adapters are allowed to reach. Must be non-empty, bare
    /// hostnames only (no wildcards, no schemes).
    #[serde(default = "default_allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Name of the env var holding the code-hosting API token
    /// (never store the token itself).
    #[serde(default = "default_github_token_env")]
    pub github_token_env: String,

    /// Registered sources.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            breaker: BreakerConfig::default(),
            allowed_domains: default_allowed_domains(),
            github_token_env: default_github_token_env(),
            sources: Vec::new(),
        }
    }
}

fn default_allowed_domains() -> Vec<String> {
    vec!["localhost".into()]
}
fn default_github_token_env() -> String {
    "GITHUB_TOKEN".into()
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Result cache time-to-live in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Directory holding normalized documents for the file connector.
    #[serde(default = "default_fallback_dir")]
    pub fallback_dir: String,

    /// Upper bound on how long a fetch may wait for a rate-limit token.
    #[serde(default = "default_rate_wait_secs")]
    pub rate_wait_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            fallback_dir: default_fallback_dir(),
            rate_wait_secs: default_rate_wait_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}
fn default_fallback_dir() -> String {
    "~/.sourcedock/fallback".into()
}
fn default_rate_wait_secs() -> u64 {
    10
}

/// `[breaker]` section.
///
/// The threshold and cooldown are deliberately configuration, not constants:
/// only the triggering status codes are fixed behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive abuse-signal failures before an endpoint's circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before permitting one trial call.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}
fn default_cooldown_secs() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// `[[sources]]` entry — one configured knowledge source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique source name callers fetch by.
    pub name: String,

    /// Disabled sources stay configured but reject fetches.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Which adapter handles this source.
    pub protocol: Protocol,

    /// Named endpoints, e.g. `search = "https://forum.example.com/search"`.
    #[serde(default)]
    pub endpoints: HashMap<String, String>,

    /// Authentication descriptor.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Sections callers may request from this source. Empty means all.
    #[serde(default)]
    pub sections: Vec<String>,

    /// Hard cap on documents per fetch, regardless of requested limit.
    #[serde(default = "default_max_docs")]
    pub max_docs_per_call: usize,

    /// Outbound request budget per minute.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Token-bucket burst size.
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// True when the upstream search API already filters by topic, so the
    /// relevance filter skips its own topic-relevance rule.
    #[serde(default)]
    pub native_query: bool,
}

impl SourceConfig {
    /// A minimal enabled source, useful for construction in tests and
    /// programmatic configuration.
    pub fn new(name: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            protocol,
            endpoints: HashMap::new(),
            auth: AuthConfig::default(),
            sections: Vec::new(),
            max_docs_per_call: default_max_docs(),
            requests_per_minute: default_requests_per_minute(),
            burst: default_burst(),
            native_query: false,
        }
    }

    /// The endpoint used for search calls: the `search` entry when present,
    /// otherwise any configured endpoint.
    pub fn primary_endpoint(&self) -> Option<&str> {
        self.endpoints
            .get("search")
            .or_else(|| self.endpoints.values().next())
            .map(String::as_str)
    }
}

fn default_true() -> bool {
    true
}
fn default_max_docs() -> usize {
    30
}
fn default_requests_per_minute() -> u32 {
    60
}
fn default_burst() -> u32 {
    5
}

/// Authentication descriptor for a source.
///
/// Only the env var *name* is stored; the credential itself is resolved at
/// call time and never serialized or logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Authentication scheme.
    #[serde(default, rename = "type")]
    pub auth_type: AuthType,

    /// Name of the env var holding the credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_env: Option<String>,
}

impl AuthConfig {
    /// Resolve the credential from the environment. `None` for `AuthType::None`
    /// or when the env var is unset/empty.
    pub fn resolve_key(&self) -> Option<String> {
        if self.auth_type == AuthType::None {
            return None;
        }
        let var = self.key_env.as_deref()?;
        match std::env::var(var) {
            Ok(v) if !v.is_empty() => Some(v),
            _ => None,
        }
    }
}

/// Supported authentication schemes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthType {
    /// No credentials.
    #[default]
    None,
    /// Bearer token in the Authorization header.
    Token,
    /// API key header.
    ApiKey,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sourcedock/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SourceDockError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sourcedock/sourcedock.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SourceDockError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SourceDockError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SourceDockError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SourceDockError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SourceDockError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("cache_ttl_secs"));
        assert!(toml_str.contains("GITHUB_TOKEN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.cache_ttl_secs, 24 * 60 * 60);
        assert_eq!(parsed.breaker.failure_threshold, 3);
    }

    #[test]
    fn config_with_sources() {
        let toml_str = r#"
allowed_domains = ["docs.example.com", "forum.example.com"]

[[sources]]
name = "team-forum"
protocol = "forum"
native_query = true

[sources.endpoints]
search = "https://forum.example.com/search"

[sources.auth]
type = "api-key"
key_env = "FORUM_API_KEY"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.sources.len(), 1);

        let src = &config.sources[0];
        assert_eq!(src.name, "team-forum");
        assert_eq!(src.protocol, Protocol::Forum);
        assert!(src.enabled);
        assert!(src.native_query);
        assert_eq!(src.auth.auth_type, AuthType::ApiKey);
        assert_eq!(
            src.primary_endpoint(),
            Some("https://forum.example.com/search")
        );
        assert_eq!(src.max_docs_per_call, 30);
    }

    #[test]
    fn auth_key_never_serialized() {
        let auth = AuthConfig {
            auth_type: AuthType::Token,
            key_env: Some("SD_TEST_TOKEN_VAR".into()),
        };
        let toml_str = toml::to_string(&auth).expect("serialize");
        // Only the env var name appears, never a credential value.
        assert!(toml_str.contains("SD_TEST_TOKEN_VAR"));

        // Unset env var resolves to no credential.
        assert!(auth.resolve_key().is_none());
    }

    #[test]
    fn none_auth_resolves_no_key() {
        let auth = AuthConfig::default();
        assert_eq!(auth.auth_type, AuthType::None);
        assert!(auth.resolve_key().is_none());
    }
}
