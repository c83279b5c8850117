//! Geocode and reverse command handlers

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::Result;
use crate::geo::get_geocoder;
use clap::Args;

/// Geocode command arguments
#[derive(Args)]
pub struct GeocodeArgs {
    /// Address or place name
    pub query: String,

    /// Prefer results around this latitude
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Prefer results around this longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Size of the preferred area in km
    #[arg(long, short = 'r', default_value_t = 25.0)]
    pub radius: f64,

    /// Output format
    #[arg(long, short = 'f', default_value = "text")]
    pub format: String,
}

/// Reverse command arguments
#[derive(Args)]
pub struct ReverseArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,

    /// Output format
    #[arg(long, short = 'f', default_value = "text")]
    pub format: String,
}

/// Run the geocode command
pub async fn run(args: GeocodeArgs) -> Result<()> {
    super::init_tracing("warn");

    let config = Config::load()?;
    let formatter = super::formatter(&args.format)?;
    let geocoder = get_geocoder(&config)?;

    let results = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => {
            let center = Coordinate::new(lat, lng);
            center.validate()?;
            geocoder
                .forward_geocode_near(&args.query, center, args.radius)
                .await
        }
        _ => geocoder.forward_geocode(&args.query).await,
    };

    super::emit(&formatter.format(&results, &config)?, None)
}

/// Run the reverse command
pub async fn run_reverse(args: ReverseArgs) -> Result<()> {
    super::init_tracing("warn");

    let config = Config::load()?;
    let formatter = super::formatter(&args.format)?;
    let coordinate = Coordinate::new(args.lat, args.lng);
    coordinate.validate()?;

    let geocoder = get_geocoder(&config)?;
    let results: Vec<_> = geocoder.reverse_geocode(coordinate).await.into_iter().collect();

    super::emit(&formatter.format(&results, &config)?, None)
}
