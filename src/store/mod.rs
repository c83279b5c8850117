//! Document store for events and hobbies
//!
//! Documents keep GeoJSON points (`[longitude, latitude]`). A nearby
//! query narrows candidates with a bounding box, then keeps those whose
//! haversine distance is within the radius, nearest first.

pub mod schema;

use crate::coord::{distance_km, enclosing_box, Coordinate};
use crate::error::{Error, Result};
use crate::location::{LocationUpdate, SharingSettings};
use chrono::{DateTime, Utc};
use schema::{HobbyCategory, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Which collection a document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Event,
    Hobby,
}

/// GeoJSON point with an optional address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
}

fn point_type() -> String {
    "Point".to_string()
}

impl GeoPoint {
    pub fn new(coordinate: Coordinate, formatted_address: Option<String>) -> Self {
        Self {
            kind: point_type(),
            coordinates: coordinate.to_lon_lat(),
            formatted_address,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::from_lon_lat(self.coordinates)
    }
}

/// A stored event or hobby
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub kind: ContentKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: HobbyCategory,
    pub location: GeoPoint,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// Parameters of a radius query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub coordinate: Coordinate,
    pub radius_km: f64,
    pub category: Option<HobbyCategory>,
}

/// A document annotated with its distance from the query point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyItem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: HobbyCategory,
    /// Kilometers from the query point
    pub distance: f64,
    pub location: GeoPoint,
}

/// Per-user location state reported by clients
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserLocation {
    pub last_update: Option<LocationUpdate>,
    pub settings: Option<SharingSettings>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// In-memory document store
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<Vec<ContentDocument>>,
    users: RwLock<HashMap<String, UserLocation>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert a document
    pub async fn insert(&self, document: ContentDocument) -> Result<Uuid> {
        document.validate()?;
        let id = document.id;

        let mut documents = self.documents.write().await;
        if documents.iter().any(|d| d.id == id) {
            return Err(Error::Validation(format!("Duplicate document id: {}", id)));
        }
        documents.push(document);
        Ok(id)
    }

    /// Load a JSON array of documents, rejecting the file if any is invalid
    pub async fn load_seed(&self, path: &Path) -> Result<usize> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to read seed file: {}", e)))?;
        let documents: Vec<ContentDocument> = serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("Failed to parse seed file: {}", e)))?;

        for (index, document) in documents.iter().enumerate() {
            document
                .validate()
                .map_err(|e| Error::Validation(format!("seed document {}: {}", index, e)))?;
        }

        let count = documents.len();
        for document in documents {
            self.insert(document).await?;
        }

        info!(count, path = %path.display(), "loaded seed documents");
        Ok(count)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn get(&self, id: Uuid) -> Option<ContentDocument> {
        self.documents.read().await.iter().find(|d| d.id == id).cloned()
    }

    /// Documents of `kind` within the query radius, nearest first, at most `limit`
    pub async fn nearby(&self, kind: ContentKind, query: &NearbyQuery, limit: usize) -> Vec<NearbyItem> {
        let bbox = enclosing_box(query.coordinate, query.radius_km);
        let documents = self.documents.read().await;

        let mut items: Vec<(f64, &ContentDocument)> = documents
            .iter()
            .filter(|d| d.kind == kind)
            .filter(|d| query.category.map_or(true, |c| d.category == c))
            .filter(|d| bbox.map_or(true, |b| b.contains(&d.location.coordinate())))
            .map(|d| (distance_km(query.coordinate, d.location.coordinate()), d))
            .filter(|(distance, _)| *distance <= query.radius_km)
            .collect();

        items.sort_by(|a, b| a.0.total_cmp(&b.0));
        items.truncate(limit);

        items
            .into_iter()
            .map(|(distance, d)| NearbyItem {
                id: d.id,
                title: d.title.clone(),
                description: d.description.clone(),
                category: d.category,
                distance: round2(distance),
                location: d.location.clone(),
            })
            .collect()
    }

    /// Record a user's reported position
    pub async fn set_user_location(&self, user_id: &str, update: LocationUpdate) -> Result<()> {
        update.validate()?;
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .last_update = Some(update);
        Ok(())
    }

    /// Record a user's sharing settings
    pub async fn set_user_settings(&self, user_id: &str, settings: SharingSettings) -> Result<()> {
        settings.validate()?;
        self.users
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .settings = Some(settings);
        Ok(())
    }

    pub async fn user_location(&self, user_id: &str) -> Option<UserLocation> {
        self.users.read().await.get(user_id).cloned()
    }
}
