//! Nearby command handler
//!
//! Queries a running backend, centered on the given or last stored position.

use crate::client::ApiClient;
use crate::config::Config;
use crate::constants::storage::LAST_LOCATION_KEY;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::format::text::nearby_table;
use crate::location::StoredPosition;
use crate::storage::{FileStore, KeyValueStore, KeyValueStoreExt, TokenStore};
use crate::store::schema::HobbyCategory;
use crate::store::{ContentKind, NearbyQuery};
use clap::Args;
use std::sync::Arc;

/// Nearby command arguments
#[derive(Args)]
pub struct NearbyArgs {
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Search radius in km
    #[arg(long, short = 'r')]
    pub radius: Option<f64>,

    /// Only this hobby category
    #[arg(long, short = 'c')]
    pub category: Option<HobbyCategory>,

    /// Query hobbies instead of events
    #[arg(long)]
    pub hobbies: bool,

    /// Print the raw JSON response
    #[arg(long)]
    pub json: bool,
}

/// Center from the arguments, else the last stored fix
fn resolve_center(args: &NearbyArgs, store: &dyn KeyValueStore) -> Result<Coordinate> {
    let center = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => Coordinate::new(lat, lng),
        _ => store
            .get::<StoredPosition>(LAST_LOCATION_KEY)?
            .map(|stored| stored.coordinate)
            .ok_or_else(|| {
                Error::Validation(
                    "No position given and none stored; use --lat/--lng or run `locate`"
                        .to_string(),
                )
            })?,
    };
    center.validate()?;
    Ok(center)
}

/// Run the nearby command
pub async fn run(args: NearbyArgs) -> Result<()> {
    super::init_tracing("warn");

    let config = Config::load()?;
    let data_dir = Config::data_dir()?;
    let store = Arc::new(FileStore::open_default()?);

    let query = NearbyQuery {
        coordinate: resolve_center(&args, store.as_ref())?,
        radius_km: args.radius.unwrap_or(config.nearby.default_radius_km),
        category: args.category,
    };
    if query.radius_km <= 0.0 {
        return Err(Error::Validation("radius must be positive".to_string()));
    }

    let kind = if args.hobbies {
        ContentKind::Hobby
    } else {
        ContentKind::Event
    };

    let tokens = Arc::new(TokenStore::open(&data_dir, store)?);
    let client = ApiClient::from_config(&config.api, tokens);
    let response = client.nearby(kind, &query).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print!("{}", nearby_table(&response.data));
    }
    Ok(())
}
