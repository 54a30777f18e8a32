//! Configuration loading for the DevSocial client.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. Explicit path (e.g. the CLI's `--config` flag)
//! 2. `$DEVSOCIAL_CONFIG`
//! 3. `~/.devsocial/config.toml` (user)
//!
//! If none of these exist the built-in defaults apply.
//!
//! The bearer token is loaded separately with a mandatory permission check:
//! `~/.devsocial/secrets.toml` (must be 0600 or 0400), falling back to the
//! `DEVSOCIAL_TOKEN` environment variable.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{CachePolicy, DEFAULT_MAX_ENTRIES, PolicyTable};
use crate::client::{InvalidationRule, InvalidationTable};
use crate::types::Method;
use crate::{DevSocialError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "DEVSOCIAL_CONFIG";

/// Environment variable holding the bearer token.
pub const TOKEN_ENV_VAR: &str = "DEVSOCIAL_TOKEN";

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// API base URL (default: `http://localhost:3000/api`).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request deadline in seconds (default: 30).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Replaces the built-in invalidation rules when present.
    #[serde(default)]
    pub invalidations: Option<Vec<InvalidationConfig>>,
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached responses (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Replaces the built-in policy table when present.
    #[serde(default)]
    pub policies: Option<Vec<PolicyConfig>>,
    /// Replaces the built-in public endpoint prefixes when present.
    #[serde(default)]
    pub public_endpoints: Option<Vec<String>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            policies: None,
            public_endpoints: None,
        }
    }
}

fn default_max_entries() -> u64 {
    DEFAULT_MAX_ENTRIES
}

/// One `[[cache.policies]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    pub prefix: String,
    /// TTL in milliseconds; 0 disables caching for the prefix.
    pub ttl_ms: u64,
    #[serde(default)]
    pub stale_while_revalidate: bool,
}

/// One `[[invalidations]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidationConfig {
    /// HTTP methods, e.g. `["POST", "DELETE"]`.
    pub methods: Vec<String>,
    /// Route pattern, e.g. `/posts/:id/like`.
    pub route: String,
    pub prefixes: Vec<String>,
}

impl ClientConfig {
    /// Load configuration from the standard locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DevSocialError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            DevSocialError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DevSocialError::Configuration(e.to_string()))
    }

    /// Resolve the config file path. `Ok(None)` means "use defaults".
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(DevSocialError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(env_path);
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(DevSocialError::Configuration(format!(
                "Config file from ${CONFIG_ENV_VAR} not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".devsocial").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(30))
    }

    /// Configured policy table, or `None` to keep the built-in one.
    pub fn policy_table(&self) -> Result<Option<PolicyTable>> {
        let Some(ref policies) = self.cache.policies else {
            return Ok(None);
        };
        let mut table = PolicyTable::empty();
        for p in policies {
            if !p.prefix.starts_with('/') {
                return Err(DevSocialError::Configuration(format!(
                    "cache policy prefix must start with '/': {}",
                    p.prefix
                )));
            }
            table.push(
                CachePolicy::new(p.prefix.clone(), Duration::from_millis(p.ttl_ms))
                    .stale_while_revalidate(p.stale_while_revalidate),
            );
        }
        Ok(Some(table))
    }

    /// Configured invalidation rules, or `None` to keep the built-in ones.
    pub fn invalidation_table(&self) -> Result<Option<InvalidationTable>> {
        let Some(ref rules) = self.invalidations else {
            return Ok(None);
        };
        let mut table = InvalidationTable::empty();
        for rule in rules {
            let methods = rule
                .methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| {
                        DevSocialError::Configuration(format!("invalid HTTP method: {m}"))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let prefixes: Vec<&str> = rule.prefixes.iter().map(String::as_str).collect();
            table.push(InvalidationRule::new(&methods, &rule.route, &prefixes));
        }
        Ok(Some(table))
    }
}

/// Secrets file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub token: Option<String>,
}

impl Secrets {
    /// Load `~/.devsocial/secrets.toml` if it exists (must be 0600 or 0400).
    ///
    /// Returns empty secrets if no file exists (the token may come from the
    /// environment).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".devsocial").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }
        Ok(Secrets::default())
    }

    /// Load a secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            DevSocialError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            DevSocialError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            DevSocialError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(DevSocialError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Bearer token from the secrets file, falling back to `$DEVSOCIAL_TOKEN`.
    pub fn token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty()))
    }
}
