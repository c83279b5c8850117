//! Geocoding module
//!
//! Provides geocoding (free text to coordinates and back) through a
//! pluggable [`GeoBackend`], plus the never-failing [`Geocoder`] wrapper
//! that UI-facing code talks to.

pub mod ip_location;
pub mod nominatim;

use crate::config::Config;
use crate::coord::{bounding_box, BoundingBox, Coordinate};
use crate::error::Result;
use crate::search::SearchResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A geocoded place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPlace {
    pub coordinate: Coordinate,
    /// Display name (address or description)
    pub formatted_address: String,
    /// Provider-assigned identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    /// Provider classification (e.g. "city", "cafe")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_type: Option<String>,
}

/// Trait for geocoding backends
///
/// Implementations report failures; [`Geocoder`] is responsible for
/// turning them into empty results.
pub trait GeoBackend: Send + Sync {
    /// Look up places matching a free-text query, optionally bounded to a viewbox
    fn search(
        &self,
        query: &str,
        viewbox: Option<BoundingBox>,
    ) -> impl std::future::Future<Output = Result<Vec<GeoPlace>>> + Send;

    /// Reverse geocode a coordinate to a place, or None if the provider has no match
    fn reverse(
        &self,
        coordinate: Coordinate,
    ) -> impl std::future::Future<Output = Result<Option<GeoPlace>>> + Send;
}

/// Geocoding client that never surfaces provider errors
///
/// A miss or provider failure is logged and reported as an empty list or
/// `None`, so the search flow keeps running.
#[derive(Debug, Clone)]
pub struct Geocoder<B> {
    backend: B,
}

impl<B: GeoBackend> Geocoder<B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Access the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Forward geocode a query into location results
    pub async fn forward_geocode(&self, query: &str) -> Vec<SearchResult> {
        self.search(query, None).await
    }

    /// Forward geocode, scoping the provider to a box around `center`
    pub async fn forward_geocode_near(
        &self,
        query: &str,
        center: Coordinate,
        radius_km: f64,
    ) -> Vec<SearchResult> {
        self.search(query, Some(bounding_box(center, radius_km))).await
    }

    async fn search(&self, query: &str, viewbox: Option<BoundingBox>) -> Vec<SearchResult> {
        match self.backend.search(query, viewbox).await {
            Ok(places) => {
                debug!(query, count = places.len(), "forward geocode");
                places.into_iter().map(SearchResult::Location).collect()
            }
            Err(e) => {
                warn!(query, error = %e, "forward geocode failed");
                Vec::new()
            }
        }
    }

    /// Reverse geocode a coordinate
    pub async fn reverse_geocode(&self, coordinate: Coordinate) -> Option<SearchResult> {
        match self.backend.reverse(coordinate).await {
            Ok(place) => place.map(SearchResult::Location),
            Err(e) => {
                warn!(%coordinate, error = %e, "reverse geocode failed");
                None
            }
        }
    }
}

/// Build the default geocoder from configuration
pub fn get_geocoder(config: &Config) -> Result<Geocoder<nominatim::NominatimBackend>> {
    Ok(Geocoder::new(nominatim::NominatimBackend::from_config(
        &config.geocoding,
    )?))
}

/// Get the IP location service
pub fn get_ip_locator() -> ip_location::IpLocator {
    ip_location::IpLocator::new()
}
