//! hobbyhub-nearby: location-aware discovery for HobbyHub
//!
//! A library and CLI for finding events and hobbies near a position.
//!
//! ## Features
//!
//! - Haversine distance and bounding boxes over lat/lng coordinates
//! - Forward and reverse geocoding (Nominatim) that never fails the caller
//! - Device location service with permission states and location sharing
//! - Debounced search over map markers and geocoded places
//! - HTTP backend with radius queries for events and hobbies
//!
//! ## Quick Start
//!
//! ```rust
//! use hobbyhub_nearby::coord::{bounding_box, distance_km, Coordinate};
//!
//! let nyc = Coordinate::new(40.7128, -74.0060);
//! let london = Coordinate::new(51.5074, -0.1278);
//!
//! let km = distance_km(nyc, london);
//! assert!((km - 5570.0).abs() < 10.0);
//!
//! let bbox = bounding_box(nyc, 5.0);
//! assert!(bbox.contains(&nyc));
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod coord;
pub mod error;
pub mod format;
pub mod geo;
pub mod location;
pub mod search;
pub mod server;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use coord::{BoundingBox, Coordinate};
pub use error::{Error, Result};
pub use geo::{GeoPlace, Geocoder};
pub use search::{MapMarker, SearchAggregator, SearchResult};
