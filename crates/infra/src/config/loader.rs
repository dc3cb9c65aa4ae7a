//! Configuration loader
//!
//! Loads [`RemoteStoreConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment if one exists
//! 2. Attempts to load from environment variables
//! 3. If the required variable is missing, falls back to loading from file
//! 4. Probes multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `TENANTLINK_CONTEXT_ENDPOINT_URL`: Tenant context service URL (required)
//! - `TENANTLINK_AUTHENTICATE`: Attach bearer tokens (true/false)
//! - `TENANTLINK_AUTHORITY`: OpenID Connect authority URL
//! - `TENANTLINK_CLIENT_ID`: OAuth client ID
//! - `TENANTLINK_CLIENT_SECRET`: OAuth client secret
//! - `TENANTLINK_SCOPE`: Scope requested with the token
//! - `TENANTLINK_REQUEST_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `TENANTLINK_CACHE_TTL_SECS`: Lookup cache TTL in seconds
//! - `TENANTLINK_CACHE_MAX_CAPACITY`: Lookup cache capacity
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./tenantlink.json` or `./tenantlink.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tenantlink_domain::{RemoteStoreConfig, Result, TenantStoreError};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["tenantlink.json", "tenantlink.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variable is missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `TenantStoreError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails to parse
pub fn load() -> Result<RemoteStoreConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Only `TENANTLINK_CONTEXT_ENDPOINT_URL` is required; everything else falls
/// back to [`RemoteStoreConfig::default`].
///
/// # Errors
/// Returns `TenantStoreError::Config` if the required variable is missing or
/// a numeric variable has an invalid value.
pub fn load_from_env() -> Result<RemoteStoreConfig> {
    let mut config = RemoteStoreConfig::new(env_var("TENANTLINK_CONTEXT_ENDPOINT_URL")?);

    config.authenticate = env_bool("TENANTLINK_AUTHENTICATE", false);
    config.authority = env_opt("TENANTLINK_AUTHORITY").unwrap_or_default();
    config.client_id = env_opt("TENANTLINK_CLIENT_ID").unwrap_or_default();
    config.client_secret = env_opt("TENANTLINK_CLIENT_SECRET").unwrap_or_default();
    config.scope = env_opt("TENANTLINK_SCOPE").unwrap_or_default();

    if let Some(timeout) = env_parse::<u64>("TENANTLINK_REQUEST_TIMEOUT_SECS")? {
        config.request_timeout_secs = timeout;
    }
    if let Some(ttl) = env_parse::<u64>("TENANTLINK_CACHE_TTL_SECS")? {
        config.policy.cache.ttl_secs = ttl;
    }
    if let Some(capacity) = env_parse::<u64>("TENANTLINK_CACHE_MAX_CAPACITY")? {
        config.policy.cache.max_capacity = capacity;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `TenantStoreError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<RemoteStoreConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TenantStoreError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TenantStoreError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TenantStoreError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<RemoteStoreConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TenantStoreError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TenantStoreError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(TenantStoreError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory first, then the executable's
/// directory.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `TenantStoreError::Config` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| {
        TenantStoreError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional environment variable; blank counts as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional environment variable
///
/// # Errors
/// Returns `TenantStoreError::Config` if the variable is set but invalid.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| TenantStoreError::Config(format!("Invalid value for {key}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
