//! Locate command handler
//!
//! Wires the location service to the configured provider, the local store
//! and the backend client.

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::geo::{get_geocoder, nominatim::NominatimBackend};
use crate::location::{ConfiguredProvider, LocationService, PermissionStatus};
use crate::storage::{FileStore, KeyValueStore, TokenStore};
use clap::{Args, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

type Service = LocationService<ConfiguredProvider, NominatimBackend, ApiClient>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Sharing {
    On,
    Off,
}

/// Locate command arguments
#[derive(Args)]
pub struct LocateArgs {
    /// Print the last stored position without taking a new fix
    #[arg(long, conflicts_with_all = ["push", "watch"])]
    pub last: bool,

    /// Send the fix to the backend
    #[arg(long)]
    pub push: bool,

    /// Turn location sharing on or off
    #[arg(long, value_enum)]
    pub share: Option<Sharing>,

    /// Geofence radius in meters (with --share)
    #[arg(long, requires = "share")]
    pub radius: Option<u32>,

    /// Keep pushing the position while sharing is on, until Ctrl-C
    #[arg(long)]
    pub watch: bool,
}

fn build_service(config: &Config) -> Result<Arc<Service>> {
    let data_dir = Config::data_dir()?;
    let store = Arc::new(FileStore::open_default()?);
    let tokens = Arc::new(TokenStore::open(&data_dir, Arc::clone(&store))?);
    let client = ApiClient::from_config(&config.api, tokens);
    let geocoder = Arc::new(get_geocoder(config)?);
    let store: Arc<dyn KeyValueStore> = store;

    Ok(Arc::new(LocationService::new(
        ConfiguredProvider::from_config(&config.location),
        geocoder,
        store,
        client,
        &config.location,
    )))
}

/// Run the locate command
pub async fn run(args: LocateArgs) -> Result<()> {
    super::init_tracing("warn");

    let config = Config::load()?;
    let service = build_service(&config)?;

    if args.last {
        match service.last_known_position()? {
            Some(stored) => println!(
                "{} (recorded {})",
                stored.coordinate,
                stored.recorded_at.to_rfc3339()
            ),
            None => println!("No stored position"),
        }
        return Ok(());
    }

    if let Some(share) = args.share {
        let settings = service
            .update_sharing_settings(share == Sharing::On, args.radius)
            .await?;
        println!(
            "Location sharing {} (radius {} m)",
            if settings.is_location_sharing_enabled { "on" } else { "off" },
            settings.geofence_radius
        );
    }

    if service.request_permission().await? != PermissionStatus::Granted {
        return Err(Error::PermissionDenied);
    }

    let coordinate = if args.push {
        service.push_current_position().await?
    } else {
        service.get_current_position().await?
    };

    match service.reverse_geocode(coordinate).await {
        Some(place) => println!("{}  {}", coordinate, place.label()),
        None => println!("{}", coordinate),
    }

    if args.watch {
        let interval = Duration::from_secs(config.location.update_interval_secs.max(1));
        info!(interval_secs = interval.as_secs(), "pushing position updates");
        let handle = Arc::clone(&service).spawn_position_updates(interval);
        tokio::signal::ctrl_c().await?;
        handle.abort();
    }

    Ok(())
}
