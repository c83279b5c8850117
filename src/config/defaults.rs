//! Default configuration values
//!
//! Named constants for all tunable parameters

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5000;

/// Default geocoding provider base URL
pub const DEFAULT_GEOCODER_URL: &str = crate::constants::api::NOMINATIM_URL;

/// Identifying User-Agent sent to the geocoding provider
pub const DEFAULT_USER_AGENT: &str = concat!("hobbyhub-nearby/", env!("CARGO_PKG_VERSION"));

/// Geocoding request timeout in seconds
pub const DEFAULT_GEOCODER_TIMEOUT_SECS: u64 = 8;

/// Maximum results requested from the geocoding provider
pub const DEFAULT_GEOCODER_LIMIT: usize = 5;

/// Default location sharing (geofence) radius in meters
pub const DEFAULT_SHARING_RADIUS_METERS: u32 = 5000;

/// Interval between background position pushes in seconds
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60;

/// Time allowed for the platform to deliver a fix in seconds
pub const DEFAULT_FIX_TIMEOUT_SECS: u64 = 15;

/// Default nearby query radius in kilometers
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 10.0;

/// Maximum documents returned by a nearby query
pub const DEFAULT_MAX_RESULTS: usize = 50;

/// Default access token lifetime in seconds (15 minutes)
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;

/// Default refresh token lifetime in seconds (7 days)
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default backend base URL used by the client
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default URL provider
pub const DEFAULT_URL_PROVIDER: &str = "openstreetmap";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "hobbyhub-nearby";
