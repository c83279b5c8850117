//! Location service
//!
//! Owns the location permission state, obtains fixes from a
//! [`PositionProvider`], remembers the last fix in local storage, and
//! forwards position updates and sharing settings to the backend.

pub mod provider;

use crate::client::LocationSync;
use crate::config::LocationConfig;
use crate::constants::storage::{LAST_LOCATION_KEY, SHARING_SETTINGS_KEY};
use crate::coord::{self, Coordinate};
use crate::error::{Error, Result};
use crate::geo::{GeoBackend, Geocoder};
use crate::search::SearchResult;
use crate::storage::{KeyValueStore, KeyValueStoreExt};
use crate::store::schema::Validate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use provider::{ConfiguredProvider, FixedPositionProvider, IpPositionProvider, PositionProvider};

/// Location permission status
///
/// `Idle -> Requesting -> Granted | Denied`; `Denied -> Requesting` only
/// on an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Idle,
    Requesting,
    Granted,
    Denied,
}

impl PermissionStatus {
    /// Enter `Requesting`
    pub fn begin_request(self) -> Result<Self> {
        match self {
            Self::Idle | Self::Denied => Ok(Self::Requesting),
            other => Err(Error::InvalidTransition(format!(
                "cannot request permission while {}",
                other
            ))),
        }
    }

    /// Leave `Requesting` with the platform's answer
    pub fn resolve(self, granted: bool) -> Result<Self> {
        match self {
            Self::Requesting if granted => Ok(Self::Granted),
            Self::Requesting => Ok(Self::Denied),
            other => Err(Error::InvalidTransition(format!(
                "no permission request in progress ({})",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Requesting => write!(f, "requesting"),
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
        }
    }
}

/// Position report sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub longitude: f64,
    pub latitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationUpdate {
    pub fn now(coordinate: Coordinate) -> Self {
        Self {
            longitude: coordinate.longitude,
            latitude: coordinate.latitude,
            timestamp: Utc::now(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Location sharing preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingSettings {
    pub is_location_sharing_enabled: bool,
    /// Geofence radius in meters
    pub geofence_radius: u32,
}

/// Last fix as kept in local storage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredPosition {
    pub coordinate: Coordinate,
    pub recorded_at: DateTime<Utc>,
}

/// Puts the permission status back if a request is dropped mid-prompt
struct PendingRequest<'a> {
    status: &'a Mutex<PermissionStatus>,
    previous: PermissionStatus,
}

impl Drop for PendingRequest<'_> {
    fn drop(&mut self) {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status == PermissionStatus::Requesting {
            *status = self.previous;
        }
    }
}

/// Device location access for the UI layer
pub struct LocationService<P, B, S> {
    provider: P,
    geocoder: Arc<Geocoder<B>>,
    store: Arc<dyn KeyValueStore>,
    sync: S,
    status: Mutex<PermissionStatus>,
    fix_timeout: Duration,
    default_radius_meters: u32,
}

impl<P, B, S> LocationService<P, B, S>
where
    P: PositionProvider,
    B: GeoBackend,
    S: LocationSync,
{
    pub fn new(
        provider: P,
        geocoder: Arc<Geocoder<B>>,
        store: Arc<dyn KeyValueStore>,
        sync: S,
        config: &LocationConfig,
    ) -> Self {
        Self {
            provider,
            geocoder,
            store,
            sync,
            status: Mutex::new(PermissionStatus::Idle),
            fix_timeout: Duration::from_secs(config.fix_timeout_secs),
            default_radius_meters: config.default_radius_meters,
        }
    }

    /// Current permission status
    pub fn status(&self) -> PermissionStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, next: impl FnOnce(PermissionStatus) -> Result<PermissionStatus>) -> Result<PermissionStatus> {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        *status = next(*status)?;
        Ok(*status)
    }

    /// Ask for location access
    ///
    /// Allowed from `Idle` or, as an explicit retry, from `Denied`. Asking
    /// again once granted is a no-op. If the returned future is dropped
    /// before the prompt answers, the status reverts to what it was.
    pub async fn request_permission(&self) -> Result<PermissionStatus> {
        let pending = {
            let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
            if *status == PermissionStatus::Granted {
                return Ok(PermissionStatus::Granted);
            }
            let previous = *status;
            *status = previous.begin_request()?;
            PendingRequest {
                status: &self.status,
                previous,
            }
        };

        let granted = self.provider.request_permission().await;
        let status = self.transition(|s| s.resolve(granted))?;
        drop(pending);

        info!(%status, "location permission resolved");
        Ok(status)
    }

    /// Get a fresh position fix and remember it
    pub async fn get_current_position(&self) -> Result<Coordinate> {
        if self.status() != PermissionStatus::Granted {
            return Err(Error::PermissionDenied);
        }

        let coordinate = match tokio::time::timeout(self.fix_timeout, self.provider.current_position()).await {
            Ok(Ok(coordinate)) => coordinate,
            Ok(Err(Error::PositionUnavailable(msg))) => return Err(Error::PositionUnavailable(msg)),
            Ok(Err(e)) => return Err(Error::PositionUnavailable(e.to_string())),
            Err(_) => {
                return Err(Error::PositionUnavailable(format!(
                    "no fix within {}s",
                    self.fix_timeout.as_secs()
                )))
            }
        };
        coordinate
            .validate()
            .map_err(|e| Error::PositionUnavailable(e.to_string()))?;

        if let Err(e) = self.persist_last_position(coordinate) {
            warn!(error = %e, "failed to persist position");
        }
        Ok(coordinate)
    }

    /// Overwrite the stored last-known position
    pub fn persist_last_position(&self, coordinate: Coordinate) -> Result<()> {
        self.store.set(
            LAST_LOCATION_KEY,
            &StoredPosition {
                coordinate,
                recorded_at: Utc::now(),
            },
        )
    }

    /// Last stored position, used to seed the map before a fresh fix
    pub fn last_known_position(&self) -> Result<Option<StoredPosition>> {
        self.store.get(LAST_LOCATION_KEY)
    }

    /// Forward geocode; empty on miss or provider failure
    pub async fn geocode(&self, query: &str) -> Vec<SearchResult> {
        self.geocoder.forward_geocode(query).await
    }

    /// Reverse geocode; None on miss or provider failure
    pub async fn reverse_geocode(&self, coordinate: Coordinate) -> Option<SearchResult> {
        self.geocoder.reverse_geocode(coordinate).await
    }

    pub fn distance_km(&self, a: Coordinate, b: Coordinate) -> f64 {
        coord::distance_km(a, b)
    }

    /// Current sharing settings; defaults when never set
    pub fn sharing_settings(&self) -> Result<SharingSettings> {
        Ok(self
            .store
            .get(SHARING_SETTINGS_KEY)?
            .unwrap_or(SharingSettings {
                is_location_sharing_enabled: false,
                geofence_radius: self.default_radius_meters,
            }))
    }

    /// Change sharing settings and forward them to the backend
    ///
    /// Settings are stored locally only once the backend accepted them, so
    /// a failed sync leaves the previous settings in effect.
    pub async fn update_sharing_settings(
        &self,
        enabled: bool,
        radius_meters: Option<u32>,
    ) -> Result<SharingSettings> {
        let settings = SharingSettings {
            is_location_sharing_enabled: enabled,
            geofence_radius: radius_meters.unwrap_or(self.default_radius_meters),
        };
        settings.validate()?;

        self.sync.update_settings(&settings).await?;
        self.store.set(SHARING_SETTINGS_KEY, &settings)?;

        debug!(?settings, "sharing settings updated");
        Ok(settings)
    }

    /// Take one fix and push it to the backend
    pub async fn push_current_position(&self) -> Result<Coordinate> {
        let coordinate = self.get_current_position().await?;
        self.sync.push_location(&LocationUpdate::now(coordinate)).await?;
        Ok(coordinate)
    }
}

impl<P, B, S> LocationService<P, B, S>
where
    P: PositionProvider + 'static,
    B: GeoBackend + 'static,
    S: LocationSync + 'static,
{
    /// Push the position every `interval` while sharing is enabled
    ///
    /// Failures are logged and the loop keeps going. Abort the handle to stop.
    pub fn spawn_position_updates(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.sharing_settings() {
                    Ok(settings) if settings.is_location_sharing_enabled => {}
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "cannot read sharing settings");
                        continue;
                    }
                }

                match self.push_current_position().await {
                    Ok(coordinate) => debug!(%coordinate, "position pushed"),
                    Err(e) => warn!(error = %e, "position push failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::RecordingSync;
    use crate::geo::testing::{place, MockBackend};
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Provider whose answer to the permission prompt can be flipped
    struct ScriptedProvider {
        grant: AtomicBool,
        position: Option<Coordinate>,
        hang: bool,
        prompt_hang: AtomicBool,
    }

    impl ScriptedProvider {
        fn granting(position: Coordinate) -> Self {
            Self {
                grant: AtomicBool::new(true),
                position: Some(position),
                hang: false,
                prompt_hang: AtomicBool::new(false),
            }
        }
    }

    impl PositionProvider for ScriptedProvider {
        async fn request_permission(&self) -> bool {
            if self.prompt_hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.grant.load(Ordering::SeqCst)
        }

        async fn current_position(&self) -> Result<Coordinate> {
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.position
                .ok_or_else(|| Error::Provider("no provider".to_string()))
        }
    }

    type TestService = LocationService<ScriptedProvider, MockBackend, RecordingSync>;

    fn service(provider: ScriptedProvider) -> (TestService, RecordingSync) {
        let sync = RecordingSync::default();
        let geocoder = Arc::new(Geocoder::new(MockBackend::with_places(vec![place(
            "Amsterdam",
            52.37,
            4.89,
        )])));
        let service = LocationService::new(
            provider,
            geocoder,
            Arc::new(MemoryStore::default()),
            sync.clone(),
            &LocationConfig::default(),
        );
        (service, sync)
    }

    #[test]
    fn test_permission_transitions() {
        use PermissionStatus::*;

        assert_eq!(Idle.begin_request().unwrap(), Requesting);
        assert_eq!(Denied.begin_request().unwrap(), Requesting);
        assert!(Requesting.begin_request().is_err());
        assert!(Granted.begin_request().is_err());

        assert_eq!(Requesting.resolve(true).unwrap(), Granted);
        assert_eq!(Requesting.resolve(false).unwrap(), Denied);
        assert!(Idle.resolve(true).is_err());
        assert!(Denied.resolve(true).is_err());
    }

    #[tokio::test]
    async fn test_position_requires_permission() {
        let (service, _) = service(ScriptedProvider::granting(Coordinate::new(1.0, 2.0)));
        assert_eq!(service.status(), PermissionStatus::Idle);
        assert!(matches!(
            service.get_current_position().await,
            Err(Error::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_denied_then_explicit_retry() {
        let provider = ScriptedProvider::granting(Coordinate::new(1.0, 2.0));
        provider.grant.store(false, Ordering::SeqCst);
        let (service, _) = service(provider);

        assert_eq!(service.request_permission().await.unwrap(), PermissionStatus::Denied);
        assert!(matches!(
            service.get_current_position().await,
            Err(Error::PermissionDenied)
        ));

        service.provider.grant.store(true, Ordering::SeqCst);
        assert_eq!(service.request_permission().await.unwrap(), PermissionStatus::Granted);
        assert_eq!(
            service.get_current_position().await.unwrap(),
            Coordinate::new(1.0, 2.0)
        );
        // Asking again once granted changes nothing
        assert_eq!(service.request_permission().await.unwrap(), PermissionStatus::Granted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_prompt_can_be_retried() {
        let provider = ScriptedProvider::granting(Coordinate::new(1.0, 2.0));
        provider.prompt_hang.store(true, Ordering::SeqCst);
        let (service, _) = service(provider);

        let abandoned =
            tokio::time::timeout(Duration::from_secs(30), service.request_permission()).await;
        assert!(abandoned.is_err());
        assert_eq!(service.status(), PermissionStatus::Idle);

        service.provider.prompt_hang.store(false, Ordering::SeqCst);
        assert_eq!(service.request_permission().await.unwrap(), PermissionStatus::Granted);
    }

    #[tokio::test]
    async fn test_fix_is_persisted() {
        let (service, _) = service(ScriptedProvider::granting(Coordinate::new(52.37, 4.89)));
        assert_eq!(service.last_known_position().unwrap(), None);

        service.request_permission().await.unwrap();
        service.get_current_position().await.unwrap();

        let stored = service.last_known_position().unwrap().unwrap();
        assert_eq!(stored.coordinate, Coordinate::new(52.37, 4.89));

        service.persist_last_position(Coordinate::new(0.5, 0.5)).unwrap();
        assert_eq!(
            service.last_known_position().unwrap().unwrap().coordinate,
            Coordinate::new(0.5, 0.5)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_position_unavailable() {
        let provider = ScriptedProvider {
            hang: true,
            ..ScriptedProvider::granting(Coordinate::new(1.0, 2.0))
        };
        let (service, _) = service(provider);
        service.request_permission().await.unwrap();

        assert!(matches!(
            service.get_current_position().await,
            Err(Error::PositionUnavailable(_))
        ));
        assert_eq!(service.last_known_position().unwrap(), None);
    }

    #[tokio::test]
    async fn test_provider_error_is_position_unavailable() {
        let provider = ScriptedProvider {
            position: None,
            ..ScriptedProvider::granting(Coordinate::new(1.0, 2.0))
        };
        let (service, _) = service(provider);
        service.request_permission().await.unwrap();

        assert!(matches!(
            service.get_current_position().await,
            Err(Error::PositionUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_sharing_settings_default_radius() {
        let (service, sync) = service(ScriptedProvider::granting(Coordinate::new(1.0, 2.0)));

        let settings = service.update_sharing_settings(true, None).await.unwrap();
        assert_eq!(settings.geofence_radius, 5000);
        assert!(settings.is_location_sharing_enabled);
        assert_eq!(service.sharing_settings().unwrap(), settings);

        let settings = service.update_sharing_settings(false, Some(1200)).await.unwrap();
        assert_eq!(settings.geofence_radius, 1200);
        assert_eq!(sync.settings.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_sync_keeps_previous_settings() {
        let (service, sync) = service(ScriptedProvider::granting(Coordinate::new(1.0, 2.0)));
        let before = service.sharing_settings().unwrap();

        sync.offline.store(true, Ordering::SeqCst);
        assert!(matches!(
            service.update_sharing_settings(true, Some(1200)).await,
            Err(Error::Server(_))
        ));
        assert_eq!(service.sharing_settings().unwrap(), before);
        assert!(!service.sharing_settings().unwrap().is_location_sharing_enabled);

        sync.offline.store(false, Ordering::SeqCst);
        let settings = service.update_sharing_settings(true, Some(1200)).await.unwrap();
        assert_eq!(service.sharing_settings().unwrap(), settings);
    }

    #[tokio::test]
    async fn test_sharing_radius_out_of_range_rejected() {
        let (service, sync) = service(ScriptedProvider::granting(Coordinate::new(1.0, 2.0)));

        for radius in [10, 100_001] {
            assert!(matches!(
                service.update_sharing_settings(true, Some(radius)).await,
                Err(Error::Validation(_))
            ));
        }
        assert!(sync.settings.lock().unwrap().is_empty());
        assert_eq!(service.sharing_settings().unwrap().geofence_radius, 5000);
    }

    #[test]
    fn test_sharing_settings_wire_names() {
        let json = serde_json::to_value(SharingSettings {
            is_location_sharing_enabled: true,
            geofence_radius: 5000,
        })
        .unwrap();
        assert_eq!(json["isLocationSharingEnabled"], true);
        assert_eq!(json["geofenceRadius"], 5000);
    }

    #[tokio::test]
    async fn test_geocode_passthroughs() {
        let (service, _) = service(ScriptedProvider::granting(Coordinate::new(1.0, 2.0)));
        assert_eq!(service.geocode("amsterdam").await.len(), 1);
        assert!(service
            .reverse_geocode(Coordinate::new(52.37, 4.89))
            .await
            .is_some());
        assert_eq!(
            service.distance_km(Coordinate::new(1.0, 1.0), Coordinate::new(1.0, 1.0)),
            0.0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_updates_only_while_sharing() {
        let (service, sync) = service(ScriptedProvider::granting(Coordinate::new(52.37, 4.89)));
        service.request_permission().await.unwrap();
        let service = Arc::new(service);

        let handle = Arc::clone(&service).spawn_position_updates(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(150)).await;
        assert!(sync.updates.lock().unwrap().is_empty());

        service.update_sharing_settings(true, None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;
        handle.abort();

        let updates = sync.updates.lock().unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].coordinate(), Coordinate::new(52.37, 4.89));
    }
}
