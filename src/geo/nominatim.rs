//! Nominatim geocoding backend (OpenStreetMap)
//!
//! Uses the free Nominatim API for geocoding.
//! Usage policy requires an identifying User-Agent on every request.
//! One attempt per call; callers decide whether to re-trigger.

use crate::config::GeocodingConfig;
use crate::coord::{BoundingBox, Coordinate};
use crate::error::{Error, Result};
use crate::geo::{GeoBackend, GeoPlace};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Nominatim geocoding backend
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

/// Nominatim search/reverse response item
#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    place_id: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    place_type: Option<String>,
}

impl NominatimBackend {
    /// Create a new Nominatim backend
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration, limit: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
        })
    }

    /// Create a backend from the `[geocoding]` config section
    pub fn from_config(config: &GeocodingConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
            config.result_limit,
        )
    }

    fn search_url(&self, query: &str, viewbox: Option<BoundingBox>) -> String {
        let mut url = format!(
            "{}/search?q={}&format=json&limit={}",
            self.base_url,
            urlencoding::encode(query),
            self.limit
        );
        if let Some(bbox) = viewbox {
            url.push_str(&format!(
                "&viewbox={}&bounded=1",
                urlencoding::encode(&bbox.to_viewbox())
            ));
        }
        url
    }

    fn reverse_url(&self, coordinate: Coordinate) -> String {
        format!(
            "{}/reverse?lat={}&lon={}&format=json",
            self.base_url, coordinate.latitude, coordinate.longitude
        )
    }

    /// Parse lat/lon strings to a coordinate
    fn parse_coords(lat: &str, lon: &str) -> Result<Coordinate> {
        let lat: f64 = lat
            .parse()
            .map_err(|_| Error::Provider(format!("Invalid latitude: {}", lat)))?;
        let lon: f64 = lon
            .parse()
            .map_err(|_| Error::Provider(format!("Invalid longitude: {}", lon)))?;
        let coordinate = Coordinate::new(lat, lon);
        coordinate
            .validate()
            .map_err(|e| Error::Provider(e.to_string()))?;
        Ok(coordinate)
    }

    fn into_place(result: NominatimResult) -> Result<GeoPlace> {
        let coordinate = Self::parse_coords(&result.lat, &result.lon)?;
        let place_id = result.place_id.and_then(|id| match id {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        Ok(GeoPlace {
            coordinate,
            formatted_address: result.display_name,
            place_id,
            place_type: result.place_type,
        })
    }

    /// Parse a search body, skipping items whose coordinates do not parse
    fn parse_search(body: serde_json::Value) -> Result<Vec<GeoPlace>> {
        let results: Vec<NominatimResult> = serde_json::from_value(body)
            .map_err(|e| Error::Provider(format!("Malformed Nominatim response: {}", e)))?;

        Ok(results
            .into_iter()
            .filter_map(|result| {
                let name = result.display_name.clone();
                match Self::into_place(result) {
                    Ok(place) => Some(place),
                    Err(e) => {
                        warn!(place = %name, error = %e, "skipping unusable Nominatim result");
                        None
                    }
                }
            })
            .collect())
    }

    /// Parse a reverse lookup body; Nominatim answers a miss with `{"error": ...}`
    fn parse_reverse(body: serde_json::Value) -> Result<Option<GeoPlace>> {
        if body.get("error").is_some() {
            return Ok(None);
        }
        let result: NominatimResult = serde_json::from_value(body)
            .map_err(|e| Error::Provider(format!("Malformed Nominatim response: {}", e)))?;
        Self::into_place(result).map(Some)
    }

    async fn get_json(&self, url: &str) -> Result<Option<serde_json::Value>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Nominatim request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Provider(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let body = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse Nominatim response: {}", e)))?;
        Ok(Some(body))
    }
}

impl GeoBackend for NominatimBackend {
    async fn search(&self, query: &str, viewbox: Option<BoundingBox>) -> Result<Vec<GeoPlace>> {
        let Some(body) = self.get_json(&self.search_url(query, viewbox)).await? else {
            return Ok(Vec::new());
        };

        Self::parse_search(body)
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<GeoPlace>> {
        match self.get_json(&self.reverse_url(coordinate)).await? {
            Some(body) => Self::parse_reverse(body),
            None => Ok(None),
        }
    }
}
