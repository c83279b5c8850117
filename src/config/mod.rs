//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/hobbyhub-nearby/config.toml

pub mod defaults;

use crate::constants::search::{DEBOUNCE_MS, MIN_QUERY_LEN};
use crate::error::{Error, Result};
use defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Geocoding provider settings
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Search aggregator settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Location service settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Nearby query settings
    #[serde(default)]
    pub nearby: NearbyConfig,

    /// Token signing settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Backend API client settings
    #[serde(default)]
    pub api: ApiConfig,

    /// URL generation settings
    #[serde(default)]
    pub url: UrlConfig,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Geocoding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Provider base URL
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,

    /// User-Agent header sent on every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_secs: u64,

    /// Maximum results per forward lookup
    #[serde(default = "default_geocoder_limit")]
    pub result_limit: usize,
}

/// Search aggregator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Debounce window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Minimum query length before searching
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

/// Location service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Geofence radius used when none is given
    #[serde(default = "default_sharing_radius")]
    pub default_radius_meters: u32,

    /// Interval between background position pushes
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// Time allowed for a position fix
    #[serde(default = "default_fix_timeout")]
    pub fix_timeout_secs: u64,

    /// Fixed latitude; with `longitude`, replaces IP lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// Fixed longitude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Nearby query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyConfig {
    /// Radius used when a request gives none (km)
    #[serde(default = "default_nearby_radius")]
    pub default_radius_km: f64,

    /// Upper bound on documents per response
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// JSON file of documents loaded at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_path: Option<PathBuf>,
}

/// Token signing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for access and refresh tokens
    #[serde(default)]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: u64,
}

/// Backend API client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the HobbyHub backend
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
}

/// URL generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Default URL provider
    #[serde(default = "default_url_provider")]
    pub default: String,

    /// URL provider templates
    #[serde(default = "default_url_providers")]
    pub providers: HashMap<String, String>,
}

// Default value functions for serde
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_geocoder_url() -> String {
    DEFAULT_GEOCODER_URL.to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_geocoder_timeout() -> u64 {
    DEFAULT_GEOCODER_TIMEOUT_SECS
}
fn default_geocoder_limit() -> usize {
    DEFAULT_GEOCODER_LIMIT
}
fn default_debounce_ms() -> u64 {
    DEBOUNCE_MS
}
fn default_min_query_len() -> usize {
    MIN_QUERY_LEN
}
fn default_sharing_radius() -> u32 {
    DEFAULT_SHARING_RADIUS_METERS
}
fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}
fn default_fix_timeout() -> u64 {
    DEFAULT_FIX_TIMEOUT_SECS
}
fn default_nearby_radius() -> f64 {
    DEFAULT_NEARBY_RADIUS_KM
}
fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}
fn default_access_ttl() -> u64 {
    DEFAULT_ACCESS_TTL_SECS
}
fn default_refresh_ttl() -> u64 {
    DEFAULT_REFRESH_TTL_SECS
}
fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}
fn default_url_provider() -> String {
    DEFAULT_URL_PROVIDER.to_string()
}
fn default_url_providers() -> HashMap<String, String> {
    let mut providers = HashMap::new();
    providers.insert(
        "google".to_string(),
        "https://www.google.com/maps/@{lat},{lng},15z".to_string(),
    );
    providers.insert(
        "openstreetmap".to_string(),
        "https://www.openstreetmap.org/#map=18/{lat}/{lng}".to_string(),
    );
    providers.insert(
        "apple".to_string(),
        "https://maps.apple.com/?ll={lat},{lng}".to_string(),
    );
    providers
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_geocoder_timeout(),
            result_limit: default_geocoder_limit(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            default_radius_meters: default_sharing_radius(),
            update_interval_secs: default_update_interval(),
            fix_timeout_secs: default_fix_timeout(),
            latitude: None,
            longitude: None,
        }
    }
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            default_radius_km: default_nearby_radius(),
            max_results: default_max_results(),
            seed_path: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
        }
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            default: default_url_provider(),
            providers: default_url_providers(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the data directory path (local storage lives here)
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
        } else {
            let config = Config::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["geocoding", "base_url"] => Some(self.geocoding.base_url.clone()),
            ["geocoding", "user_agent"] => Some(self.geocoding.user_agent.clone()),
            ["geocoding", "timeout_secs"] => Some(self.geocoding.timeout_secs.to_string()),
            ["geocoding", "result_limit"] => Some(self.geocoding.result_limit.to_string()),

            ["search", "debounce_ms"] => Some(self.search.debounce_ms.to_string()),
            ["search", "min_query_len"] => Some(self.search.min_query_len.to_string()),

            ["location", "default_radius_meters"] => {
                Some(self.location.default_radius_meters.to_string())
            }
            ["location", "update_interval_secs"] => {
                Some(self.location.update_interval_secs.to_string())
            }
            ["location", "fix_timeout_secs"] => Some(self.location.fix_timeout_secs.to_string()),
            ["location", "latitude"] => self.location.latitude.map(|v| v.to_string()),
            ["location", "longitude"] => self.location.longitude.map(|v| v.to_string()),

            ["nearby", "default_radius_km"] => Some(self.nearby.default_radius_km.to_string()),
            ["nearby", "max_results"] => Some(self.nearby.max_results.to_string()),
            ["nearby", "seed_path"] => self
                .nearby
                .seed_path
                .as_ref()
                .map(|p| p.display().to_string()),

            ["auth", "jwt_secret"] => Some(self.auth.jwt_secret.clone()),
            ["auth", "access_ttl_secs"] => Some(self.auth.access_ttl_secs.to_string()),
            ["auth", "refresh_ttl_secs"] => Some(self.auth.refresh_ttl_secs.to_string()),

            ["api", "base_url"] => Some(self.api.base_url.clone()),

            ["url", "default"] => Some(self.url.default.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .parse()
                .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
        }

        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => self.server.port = parse(key, value)?,

            ["geocoding", "base_url"] => self.geocoding.base_url = value.to_string(),
            ["geocoding", "user_agent"] => self.geocoding.user_agent = value.to_string(),
            ["geocoding", "timeout_secs"] => self.geocoding.timeout_secs = parse(key, value)?,
            ["geocoding", "result_limit"] => self.geocoding.result_limit = parse(key, value)?,

            ["search", "debounce_ms"] => self.search.debounce_ms = parse(key, value)?,
            ["search", "min_query_len"] => self.search.min_query_len = parse(key, value)?,

            ["location", "default_radius_meters"] => {
                self.location.default_radius_meters = parse(key, value)?
            }
            ["location", "update_interval_secs"] => {
                self.location.update_interval_secs = parse(key, value)?
            }
            ["location", "fix_timeout_secs"] => {
                self.location.fix_timeout_secs = parse(key, value)?
            }
            ["location", "latitude"] => self.location.latitude = Some(parse(key, value)?),
            ["location", "longitude"] => self.location.longitude = Some(parse(key, value)?),

            ["nearby", "default_radius_km"] => {
                self.nearby.default_radius_km = parse(key, value)?
            }
            ["nearby", "max_results"] => self.nearby.max_results = parse(key, value)?,
            ["nearby", "seed_path"] => self.nearby.seed_path = Some(PathBuf::from(value)),

            ["auth", "jwt_secret"] => self.auth.jwt_secret = value.to_string(),
            ["auth", "access_ttl_secs"] => self.auth.access_ttl_secs = parse(key, value)?,
            ["auth", "refresh_ttl_secs"] => self.auth.refresh_ttl_secs = parse(key, value)?,

            ["api", "base_url"] => self.api.base_url = value.to_string(),

            ["url", "default"] => self.url.default = value.to_string(),

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "server.host",
            "server.port",
            "geocoding.base_url",
            "geocoding.user_agent",
            "geocoding.timeout_secs",
            "geocoding.result_limit",
            "search.debounce_ms",
            "search.min_query_len",
            "location.default_radius_meters",
            "location.update_interval_secs",
            "location.fix_timeout_secs",
            "location.latitude",
            "location.longitude",
            "nearby.default_radius_km",
            "nearby.max_results",
            "nearby.seed_path",
            "auth.jwt_secret",
            "auth.access_ttl_secs",
            "auth.refresh_ttl_secs",
            "api.base_url",
            "url.default",
        ]
    }

    /// Format a URL using the specified provider
    ///
    /// Replaces {lat} and {lng} placeholders with actual values
    pub fn format_url(&self, provider: Option<&str>, lat: f64, lng: f64) -> Result<String> {
        let provider_name = provider.unwrap_or(&self.url.default);

        let template = self
            .url
            .providers
            .get(provider_name)
            .ok_or_else(|| Error::Config(format!("Unknown URL provider: {}", provider_name)))?;

        Ok(template
            .replace("{lat}", &lat.to_string())
            .replace("{lng}", &lng.to_string()))
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
