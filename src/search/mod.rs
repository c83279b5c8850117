//! Nearby search
//!
//! Combines map markers already loaded on the client with geocoded
//! places. The matching and merging here is synchronous; the debounced
//! driver lives in [`aggregator`].

pub mod aggregator;

use crate::constants::search::DEDUP_DISTANCE_KM;
use crate::coord::{distance_km, Coordinate};
use crate::geo::GeoPlace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use aggregator::{SearchAggregator, SearchState};

/// A point of interest shown on the map (event, hobby, or user post)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub id: String,
    pub coordinate: Coordinate,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Category tag of the owning entity
    #[serde(default)]
    pub category: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
}

/// One row of the combined result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchResult {
    Marker(MapMarker),
    Location(GeoPlace),
}

impl SearchResult {
    /// Coordinate to center the map on
    pub fn coordinate(&self) -> Coordinate {
        match self {
            Self::Marker(marker) => marker.coordinate,
            Self::Location(place) => place.coordinate,
        }
    }

    /// Primary display text
    pub fn label(&self) -> &str {
        match self {
            Self::Marker(marker) => &marker.title,
            Self::Location(place) => &place.formatted_address,
        }
    }

    /// Text carried by a location-select event
    pub fn description(&self) -> String {
        match self {
            Self::Marker(marker) if marker.description.is_empty() => marker.title.clone(),
            Self::Marker(marker) => format!("{} - {}", marker.title, marker.description),
            Self::Location(place) => place.formatted_address.clone(),
        }
    }

    pub fn is_marker(&self) -> bool {
        matches!(self, Self::Marker(_))
    }
}

/// Emitted when the user picks a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSelect {
    pub coordinate: Coordinate,
    pub description: String,
}

impl From<&SearchResult> for LocationSelect {
    fn from(result: &SearchResult) -> Self {
        Self {
            coordinate: result.coordinate(),
            description: result.description(),
        }
    }
}

/// Markers whose title or description contains the query, ignoring case
pub fn match_markers(markers: &[MapMarker], query: &str) -> Vec<MapMarker> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    markers
        .iter()
        .filter(|m| {
            m.title.to_lowercase().contains(&needle)
                || m.description.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Order markers by distance from `origin`, keeping input order on ties
pub fn rank_by_proximity(markers: &mut [MapMarker], origin: Coordinate) {
    markers.sort_by(|a, b| {
        distance_km(origin, a.coordinate).total_cmp(&distance_km(origin, b.coordinate))
    });
}

/// Marker matches first, then geocoded places
///
/// A geocoded place is dropped when a matched marker with the same label
/// sits within `DEDUP_DISTANCE_KM` of it.
pub fn merge_results(markers: Vec<MapMarker>, geocoded: Vec<SearchResult>) -> Vec<SearchResult> {
    let geocoded: Vec<SearchResult> = geocoded
        .into_iter()
        .filter(|result| {
            !markers.iter().any(|m| {
                m.title.eq_ignore_ascii_case(result.label())
                    && distance_km(m.coordinate, result.coordinate()) <= DEDUP_DISTANCE_KM
            })
        })
        .collect();

    markers
        .into_iter()
        .map(SearchResult::Marker)
        .chain(geocoded)
        .collect()
}
