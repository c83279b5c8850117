//! Centralized constants for the hobbyhub-nearby crate
//!
//! Constants shared by more than one module live here.

/// Geographic constants
pub mod geo {
    /// Mean Earth radius in kilometers
    pub const EARTH_RADIUS_KM: f64 = 6371.0;

    /// Kilometers per degree of latitude (approximate, varies slightly with latitude)
    pub const KM_PER_DEGREE_LAT: f64 = 111.32;

    /// Latitude beyond which the bounding box longitude span is clamped
    pub const POLAR_CLAMP_LAT: f64 = 85.0;
}

/// External API endpoints
pub mod api {
    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// IP geolocation API (free, no key required)
    pub const IP_API_URL: &str = "http://ip-api.com/json";

    /// Version prefix for all backend routes
    pub const API_PREFIX: &str = "/api/v1";
}

/// Search aggregator tuning
pub mod search {
    /// Quiet period before a query is acted on
    pub const DEBOUNCE_MS: u64 = 300;

    /// Queries shorter than this clear results without searching
    pub const MIN_QUERY_LEN: usize = 3;

    /// Geocoded results this close to a same-named marker are duplicates
    pub const DEDUP_DISTANCE_KM: f64 = 0.05;
}

/// Local storage keys and cache settings
pub mod storage {
    /// Key for the most recent position fix
    pub const LAST_LOCATION_KEY: &str = "lastKnownLocation";

    /// Key for the location sharing settings
    pub const SHARING_SETTINGS_KEY: &str = "locationSharingSettings";

    /// Key for the access token
    pub const AUTH_TOKEN_KEY: &str = "authToken";

    /// Key for the refresh token
    pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

    /// General store file name
    pub const STORE_FILE_NAME: &str = "store.json";

    /// Token store file name
    pub const SECURE_STORE_FILE_NAME: &str = "secure_store.json";

    /// IP location cache duration in seconds (1 hour)
    pub const IP_LOCATION_TTL_SECS: u64 = 3600;

    /// IP location cache file name
    pub const IP_LOCATION_CACHE_FILE: &str = "ip_location_cache.json";
}
