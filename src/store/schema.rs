//! Document validation
//!
//! Field rules for stored documents and incoming payloads, kept apart
//! from the storage code so any backing store enforces the same limits.

use crate::error::{Error, Result};
use crate::location::{LocationUpdate, SharingSettings};
use crate::store::{ContentDocument, GeoPoint};
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
pub const ADDRESS_MAX_CHARS: usize = 300;
pub const GEOFENCE_MIN_METERS: u32 = 50;
pub const GEOFENCE_MAX_METERS: u32 = 100_000;

/// Structural validation of a value
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Hobby categories shared by events and hobbies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HobbyCategory {
    Sports,
    Arts,
    Music,
    Technology,
    Outdoors,
    Food,
    Gaming,
    Education,
    Social,
    Other,
}

impl HobbyCategory {
    pub const ALL: [HobbyCategory; 10] = [
        Self::Sports,
        Self::Arts,
        Self::Music,
        Self::Technology,
        Self::Outdoors,
        Self::Food,
        Self::Gaming,
        Self::Education,
        Self::Social,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sports => "sports",
            Self::Arts => "arts",
            Self::Music => "music",
            Self::Technology => "technology",
            Self::Outdoors => "outdoors",
            Self::Food => "food",
            Self::Gaming => "gaming",
            Self::Education => "education",
            Self::Social => "social",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for HobbyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HobbyCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| Error::Validation(format!("Unknown category: {}", s)))
    }
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    if len > max {
        return Err(Error::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

impl Validate for GeoPoint {
    fn validate(&self) -> Result<()> {
        if self.kind != "Point" {
            return Err(Error::Validation(format!(
                "location type must be Point, got {}",
                self.kind
            )));
        }
        self.coordinate().validate()?;
        if let Some(address) = &self.formatted_address {
            check_length("formattedAddress", address, 0, ADDRESS_MAX_CHARS)?;
        }
        Ok(())
    }
}

impl Validate for ContentDocument {
    fn validate(&self) -> Result<()> {
        check_length("title", &self.title, 1, TITLE_MAX_CHARS)?;
        check_length("description", &self.description, 0, DESCRIPTION_MAX_CHARS)?;
        self.location.validate()
    }
}

impl Validate for LocationUpdate {
    fn validate(&self) -> Result<()> {
        self.coordinate().validate()
    }
}

impl Validate for SharingSettings {
    fn validate(&self) -> Result<()> {
        if !(GEOFENCE_MIN_METERS..=GEOFENCE_MAX_METERS).contains(&self.geofence_radius) {
            return Err(Error::Validation(format!(
                "geofenceRadius must be between {} and {} meters",
                GEOFENCE_MIN_METERS, GEOFENCE_MAX_METERS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use crate::store::ContentKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn document(title: &str) -> ContentDocument {
        ContentDocument {
            id: Uuid::new_v4(),
            kind: ContentKind::Event,
            title: title.to_string(),
            description: String::new(),
            category: HobbyCategory::Arts,
            location: GeoPoint::new(Coordinate::new(40.71, -74.0), None),
            created_at: Utc::now(),
            created_by: None,
        }
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Music".parse::<HobbyCategory>().unwrap(), HobbyCategory::Music);
        assert_eq!(" outdoors ".parse::<HobbyCategory>().unwrap(), HobbyCategory::Outdoors);
        assert!("knitting-circle".parse::<HobbyCategory>().is_err());
        for category in HobbyCategory::ALL {
            assert_eq!(category.to_string().parse::<HobbyCategory>().unwrap(), category);
        }
    }

    #[test]
    fn test_category_serde_matches_display() {
        let json = serde_json::to_value(HobbyCategory::Technology).unwrap();
        assert_eq!(json, "technology");
    }

    #[test]
    fn test_title_rules() {
        assert!(document("Open Mic").validate().is_ok());
        assert!(document("   ").validate().is_err());
        assert!(document(&"x".repeat(TITLE_MAX_CHARS)).validate().is_ok());
        assert!(document(&"x".repeat(TITLE_MAX_CHARS + 1)).validate().is_err());
    }

    #[test]
    fn test_description_limit() {
        let mut doc = document("Open Mic");
        doc.description = "y".repeat(DESCRIPTION_MAX_CHARS + 1);
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_location_rules() {
        let mut doc = document("Open Mic");
        doc.location.coordinates = [-200.0, 0.0];
        assert!(doc.validate().is_err());

        let mut doc = document("Open Mic");
        doc.location.kind = "Polygon".to_string();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_geofence_bounds() {
        let settings = |radius| SharingSettings {
            is_location_sharing_enabled: true,
            geofence_radius: radius,
        };
        assert!(settings(5000).validate().is_ok());
        assert!(settings(0).validate().is_err());
        assert!(settings(GEOFENCE_MAX_METERS + 1).validate().is_err());
    }
}
