//! Search command handler
//!
//! Runs one search the way the map search box does: loaded markers first,
//! then geocoded places.

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::geo::get_geocoder;
use crate::search::{MapMarker, SearchAggregator};
use clap::Args;
use std::path::Path;
use std::sync::Arc;

/// Search command arguments
#[derive(Args)]
pub struct SearchArgs {
    /// Search text
    pub query: String,

    /// JSON file with the map markers to search
    #[arg(long, short = 'm')]
    pub markers: Option<String>,

    /// Latitude to rank marker matches from
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude to rank marker matches from
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Output format
    #[arg(long, short = 'f', default_value = "text")]
    pub format: String,

    /// Write output to file
    #[arg(long, short = 'o')]
    pub output: Option<String>,
}

/// Read a markers file
pub fn load_markers(path: &Path) -> Result<Vec<MapMarker>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Storage(format!("Failed to read markers file: {}", e)))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Storage(format!("Failed to parse markers file: {}", e)))
}

/// Run the search command
pub async fn run(args: SearchArgs) -> Result<()> {
    super::init_tracing("warn");

    let config = Config::load()?;
    let formatter = super::formatter(&args.format)?;

    let markers = match &args.markers {
        Some(path) => load_markers(Path::new(path))?,
        None => Vec::new(),
    };

    let geocoder = Arc::new(get_geocoder(&config)?);
    let aggregator = SearchAggregator::from_config(geocoder, markers, &config.search);

    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        let origin = Coordinate::new(lat, lng);
        origin.validate()?;
        aggregator.set_origin(Some(origin));
    }

    if args.query.trim().chars().count() < config.search.min_query_len {
        return Err(Error::Validation(format!(
            "Query must be at least {} characters",
            config.search.min_query_len
        )));
    }

    let results = aggregator.search_once(&args.query).await;
    let output = formatter.format(&results, &config)?;
    super::emit(&output, args.output.as_deref())
}
