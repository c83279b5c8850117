//! IP-based geolocation
//!
//! Coarse position from ip-api.com, used where no platform location
//! provider exists (the CLI). Successful lookups are cached on disk.

use crate::constants::api::IP_API_URL;
use crate::constants::storage::{IP_LOCATION_CACHE_FILE, IP_LOCATION_TTL_SECS};
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::GeoPlace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// IP location service with caching
#[derive(Debug)]
pub struct IpLocator {
    client: reqwest::Client,
    cache_path: Option<PathBuf>,
}

/// ip-api.com response
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedPlace {
    place: GeoPlace,
    fetched_at: DateTime<Utc>,
}

impl IpLocator {
    /// Create a new IP locator with the default cache path
    pub fn new() -> Self {
        let cache_path = dirs::cache_dir()
            .map(|p| p.join(crate::config::defaults::APP_DIR_NAME).join(IP_LOCATION_CACHE_FILE));

        Self {
            client: reqwest::Client::new(),
            cache_path,
        }
    }

    /// Create an IP locator with a specific cache path
    pub fn with_cache_path(cache_path: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_path: Some(cache_path),
        }
    }

    /// Create an IP locator without caching
    pub fn without_cache() -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_path: None,
        }
    }

    /// Get current location based on IP address
    pub async fn locate(&self) -> Result<GeoPlace> {
        if let Some(cached) = self.load_cache() {
            debug!(place = %cached.formatted_address, "using cached IP location");
            return Ok(cached);
        }

        let place = self.fetch_location().await?;
        self.save_cache(&place);
        Ok(place)
    }

    async fn fetch_location(&self) -> Result<GeoPlace> {
        let response = self
            .client
            .get(IP_API_URL)
            .send()
            .await
            .map_err(|e| Error::PositionUnavailable(format!("IP location request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::PositionUnavailable(format!(
                "IP location API returned status: {}",
                response.status()
            )));
        }

        let data: IpApiResponse = response.json().await.map_err(|e| {
            Error::PositionUnavailable(format!("Failed to parse IP location response: {}", e))
        })?;

        Self::into_place(data)
    }

    fn into_place(data: IpApiResponse) -> Result<GeoPlace> {
        if data.status != "success" {
            return Err(Error::PositionUnavailable(
                "IP location lookup failed".to_string(),
            ));
        }

        let (Some(lat), Some(lon)) = (data.lat, data.lon) else {
            return Err(Error::PositionUnavailable(
                "IP location response has no coordinates".to_string(),
            ));
        };

        let formatted_address = [data.city, data.region_name, data.country]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");

        Ok(GeoPlace {
            coordinate: Coordinate::new(lat, lon),
            formatted_address: if formatted_address.is_empty() {
                "Unknown Location".to_string()
            } else {
                formatted_address
            },
            place_id: None,
            place_type: Some("ip".to_string()),
        })
    }

    fn load_cache(&self) -> Option<GeoPlace> {
        let content = fs::read_to_string(self.cache_path.as_ref()?).ok()?;
        let cached: CachedPlace = serde_json::from_str(&content).ok()?;

        let age = Utc::now().signed_duration_since(cached.fetched_at);
        if age.num_seconds() >= 0 && (age.num_seconds() as u64) < IP_LOCATION_TTL_SECS {
            Some(cached.place)
        } else {
            None
        }
    }

    fn save_cache(&self, place: &GeoPlace) {
        let Some(cache_path) = &self.cache_path else {
            return;
        };

        if let Some(parent) = cache_path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let cached = CachedPlace {
            place: place.clone(),
            fetched_at: Utc::now(),
        };

        if let Ok(content) = serde_json::to_string_pretty(&cached) {
            let _ = fs::write(cache_path, content);
        }
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        if let Some(cache_path) = &self.cache_path {
            let _ = fs::remove_file(cache_path);
        }
    }
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ip_locator_without_cache() {
        let locator = IpLocator::without_cache();
        assert!(locator.cache_path.is_none());
        assert!(locator.load_cache().is_none());
    }

    #[test]
    fn test_cache_operations() {
        let temp_dir = TempDir::new().unwrap();
        let locator = IpLocator::with_cache_path(temp_dir.path().join("ip.json"));

        assert!(locator.load_cache().is_none());

        let place = GeoPlace {
            coordinate: Coordinate::new(40.7128, -74.0060),
            formatted_address: "New York".to_string(),
            place_id: None,
            place_type: Some("ip".to_string()),
        };
        locator.save_cache(&place);
        assert_eq!(locator.load_cache(), Some(place));

        locator.clear_cache();
        assert!(locator.load_cache().is_none());
    }

    #[test]
    fn test_expired_cache_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ip.json");
        let stale = CachedPlace {
            place: GeoPlace {
                coordinate: Coordinate::new(1.0, 2.0),
                formatted_address: "Old".to_string(),
                place_id: None,
                place_type: None,
            },
            fetched_at: Utc::now() - chrono::Duration::hours(2),
        };
        fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        let locator = IpLocator::with_cache_path(path);
        assert!(locator.load_cache().is_none());
    }

    #[test]
    fn test_response_mapping() {
        let data: IpApiResponse = serde_json::from_value(serde_json::json!({
            "status": "success",
            "lat": 52.37,
            "lon": 4.89,
            "city": "Amsterdam",
            "regionName": "North Holland",
            "country": "Netherlands"
        }))
        .unwrap();
        let place = IpLocator::into_place(data).unwrap();
        assert_eq!(place.formatted_address, "Amsterdam, North Holland, Netherlands");
        assert_eq!(place.coordinate, Coordinate::new(52.37, 4.89));

        let failed: IpApiResponse =
            serde_json::from_value(serde_json::json!({ "status": "fail" })).unwrap();
        assert!(matches!(
            IpLocator::into_place(failed),
            Err(Error::PositionUnavailable(_))
        ));
    }
}
