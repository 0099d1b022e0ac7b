//! Configuration loading and data directory resolution
//!
//! Data directory resolution follows a 4-tier priority order:
//! 1. Command-line argument (highest priority)
//! 2. `DRP_DATA_DIR` environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Provider credentials resolve environment-first (ENV -> TOML); an absent
//! credential disables that provider's strategy rather than failing startup.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Optional values loadable from `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub data_dir: Option<String>,
    pub gemini_api_key: Option<String>,
    pub google_maps_api_key: Option<String>,
    pub twitter_api_key: Option<String>,
    pub relay_url: Option<String>,
    pub relay_token: Option<String>,
    pub fallback_ttl_secs: Option<u64>,
    pub nominatim_url: Option<String>,
    pub fema_disasters_url: Option<String>,
}

/// Resolved runtime settings shared by the enrichment service
#[derive(Debug, Clone)]
pub struct Settings {
    /// Gemini API key; `None` disables the LLM-backed analysis strategies
    pub gemini_api_key: Option<String>,
    /// Google Maps API key; `None` disables the primary geocoding strategy
    pub google_maps_api_key: Option<String>,
    /// Social media API key; `None` disables the live social strategy
    pub twitter_api_key: Option<String>,
    /// Base URL of the realtime relay; `None` disables event emission
    pub relay_url: Option<String>,
    /// Bearer token presented to the relay ingestion endpoint
    pub relay_token: Option<String>,
    /// TTL applied to offline/mock resolution results (shorter than the
    /// per-resolver TTLs used for genuine provider answers)
    pub fallback_ttl: Duration,
    /// Nominatim endpoint (keyless secondary geocoding strategy)
    pub nominatim_url: String,
    /// FEMA disasters page fetched by the official-bulletin primary strategy
    pub fema_disasters_url: String,
}

/// Default TTL for cached offline/mock results (10 minutes)
const DEFAULT_FALLBACK_TTL_SECS: u64 = 600;

const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const DEFAULT_FEMA_DISASTERS_URL: &str = "https://www.fema.gov/disasters";

/// Endpoint guaranteed to refuse connections immediately; lets keyless
/// strategies fail fast in environments with no network access
const UNROUTABLE_URL: &str = "http://127.0.0.1:1";

impl Settings {
    /// Resolve settings from environment variables, falling back to the TOML
    /// config file. Each credential's source is logged for diagnosis.
    pub fn resolve() -> Self {
        let toml_config = load_toml_config();

        let gemini_api_key = resolve_credential(
            "DRP_GEMINI_API_KEY",
            toml_config.gemini_api_key.as_deref(),
            "Gemini API key",
        );
        let google_maps_api_key = resolve_credential(
            "DRP_GOOGLE_MAPS_API_KEY",
            toml_config.google_maps_api_key.as_deref(),
            "Google Maps API key",
        );
        let twitter_api_key = resolve_credential(
            "DRP_TWITTER_API_KEY",
            toml_config.twitter_api_key.as_deref(),
            "social media API key",
        );
        let relay_url = resolve_credential(
            "DRP_RELAY_URL",
            toml_config.relay_url.as_deref(),
            "realtime relay URL",
        );
        let relay_token = resolve_credential(
            "DRP_RELAY_TOKEN",
            toml_config.relay_token.as_deref(),
            "realtime relay token",
        );

        let fallback_ttl_secs = std::env::var("DRP_FALLBACK_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .or(toml_config.fallback_ttl_secs)
            .unwrap_or(DEFAULT_FALLBACK_TTL_SECS);

        let nominatim_url = std::env::var("DRP_NOMINATIM_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(toml_config.nominatim_url)
            .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_string());

        let fema_disasters_url = std::env::var("DRP_FEMA_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or(toml_config.fema_disasters_url)
            .unwrap_or_else(|| DEFAULT_FEMA_DISASTERS_URL.to_string());

        Settings {
            gemini_api_key,
            google_maps_api_key,
            twitter_api_key,
            relay_url,
            relay_token,
            fallback_ttl: Duration::from_secs(fallback_ttl_secs),
            nominatim_url,
            fema_disasters_url,
        }
    }

    /// Settings with every provider unconfigured and keyless endpoints
    /// pointed at an unroutable address, so every resolution falls through
    /// to its deterministic offline strategy without touching the network
    pub fn offline() -> Self {
        Settings {
            gemini_api_key: None,
            google_maps_api_key: None,
            twitter_api_key: None,
            relay_url: None,
            relay_token: None,
            fallback_ttl: Duration::from_secs(DEFAULT_FALLBACK_TTL_SECS),
            nominatim_url: UNROUTABLE_URL.to_string(),
            fema_disasters_url: UNROUTABLE_URL.to_string(),
        }
    }
}

/// Resolve one credential: ENV first, then TOML. Empty strings are treated
/// as unset so a blank env var does not enable a provider.
fn resolve_credential(env_var: &str, toml_value: Option<&str>, label: &str) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            info!("{} loaded from environment ({})", label, env_var);
            return Some(value);
        }
    }

    if let Some(value) = toml_value {
        if !value.trim().is_empty() {
            info!("{} loaded from config file", label);
            return Some(value.to_string());
        }
    }

    None
}

/// Resolve the data directory (holds the SQLite database)
pub fn resolve_data_dir(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("DRP_DATA_DIR") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(dir) = load_toml_config().data_dir {
        return PathBuf::from(dir);
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir()
}

/// Load the TOML config file, returning defaults when absent or unreadable
pub fn load_toml_config() -> TomlConfig {
    let path = match config_file_path() {
        Ok(path) => path,
        Err(_) => return TomlConfig::default(),
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return TomlConfig::default(),
    };

    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring malformed config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// Get configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/drp/config.toml first, then /etc/drp/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("drp").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/drp/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("drp").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        }
    }
}

/// Get OS-dependent default data directory path
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("drp"))
        .unwrap_or_else(|| PathBuf::from("./drp_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_takes_priority() {
        let dir = resolve_data_dir(Some("/tmp/drp-test"));
        assert_eq!(dir, PathBuf::from("/tmp/drp-test"));
    }

    #[test]
    fn offline_settings_have_no_providers() {
        let settings = Settings::offline();
        assert!(settings.gemini_api_key.is_none());
        assert!(settings.google_maps_api_key.is_none());
        assert!(settings.twitter_api_key.is_none());
        assert!(settings.relay_url.is_none());
    }
}
