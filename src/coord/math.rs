//! Distance and bounding box math
//!
//! Pure functions, no I/O.

use crate::constants::geo::{EARTH_RADIUS_KM, KM_PER_DEGREE_LAT, POLAR_CLAMP_LAT};
use crate::coord::{BoundingBox, Coordinate};
use std::f64::consts::PI;

/// Convert degrees to radians
pub fn to_radians(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

/// Convert radians to degrees
pub fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / PI
}

/// Calculate the great-circle distance between two points in kilometers (Haversine formula)
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = to_radians(a.latitude);
    let lat2 = to_radians(b.latitude);
    let delta_lat = to_radians(b.latitude - a.latitude);
    let delta_lng = to_radians(b.longitude - a.longitude);

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Approximate a square region of `radius_km` around `center`
///
/// The longitude span widens with `1/cos(latitude)`. Above
/// `POLAR_CLAMP_LAT` the cosine is held at its value there, and the
/// result is clamped to valid coordinate ranges, so `min <= max` holds
/// for any non-negative radius.
pub fn bounding_box(center: Coordinate, radius_km: f64) -> BoundingBox {
    let radius_km = radius_km.max(0.0);
    let delta_lat = radius_km / KM_PER_DEGREE_LAT;

    let clamped_lat = center.latitude.clamp(-POLAR_CLAMP_LAT, POLAR_CLAMP_LAT);
    let delta_lon = radius_km / (KM_PER_DEGREE_LAT * to_radians(clamped_lat).cos());

    BoundingBox {
        min_lon: (center.longitude - delta_lon).max(-180.0),
        min_lat: (center.latitude - delta_lat).max(-90.0),
        max_lon: (center.longitude + delta_lon).min(180.0),
        max_lat: (center.latitude + delta_lat).min(90.0),
    }
}

/// Slack added to each side of an enclosing box, in degrees
const ENCLOSING_MARGIN_DEG: f64 = 1e-6;

/// Smallest box holding every point whose haversine distance from
/// `center` is at most `radius_km`
///
/// Spans come from the same sphere `distance_km` uses: the latitude
/// half-span is the angular radius and the longitude half-span is
/// `asin(sin(r / R) / cos(latitude))`. Returns None when the circle
/// reaches a pole or crosses the antimeridian, where no single
/// rectangle encloses it.
pub fn enclosing_box(center: Coordinate, radius_km: f64) -> Option<BoundingBox> {
    let angular = radius_km.max(0.0) / EARTH_RADIUS_KM;
    let delta_lat = to_degrees(angular) + ENCLOSING_MARGIN_DEG;
    if center.latitude.abs() + delta_lat >= 90.0 {
        return None;
    }

    let ratio = angular.sin() / to_radians(center.latitude).cos();
    if angular >= PI / 2.0 || ratio >= 1.0 {
        return None;
    }
    let delta_lon = to_degrees(ratio.asin()) + ENCLOSING_MARGIN_DEG;

    let bbox = BoundingBox {
        min_lon: center.longitude - delta_lon,
        min_lat: center.latitude - delta_lat,
        max_lon: center.longitude + delta_lon,
        max_lat: center.latitude + delta_lat,
    };
    if bbox.min_lon < -180.0 || bbox.max_lon > 180.0 {
        return None;
    }
    Some(bbox)
}

/// Check if a point is within `radius_km` of `center`
pub fn is_within(point: Coordinate, center: Coordinate, radius_km: f64) -> bool {
    distance_km(point, center) <= radius_km
}
