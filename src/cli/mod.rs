//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod config;
pub mod geocode;
pub mod locate;
pub mod nearby;
pub mod search;
pub mod serve;

use crate::error::{Error, Result};
use crate::format::{available_formats, get_formatter, OutputFormatter};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Location-aware discovery for HobbyHub
#[derive(Parser)]
#[command(name = "hobbyhub-nearby")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the backend server (foreground)
    Serve(serve::ServeArgs),

    /// Search markers and places like the map search box
    Search(search::SearchArgs),

    /// Forward geocode an address or place name
    Geocode(geocode::GeocodeArgs),

    /// Reverse geocode a coordinate
    Reverse(geocode::ReverseArgs),

    /// Get the current position and manage location sharing
    Locate(locate::LocateArgs),

    /// Query a running backend for nearby events or hobbies
    Nearby(nearby::NearbyArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve::run(args).await,
        Commands::Search(args) => search::run(args).await,
        Commands::Geocode(args) => geocode::run(args).await,
        Commands::Reverse(args) => geocode::run_reverse(args).await,
        Commands::Locate(args) => locate::run(args).await,
        Commands::Nearby(args) => nearby::run(args).await,
        Commands::Config(args) => config::run(args),
    }
}

/// Initialize logging; `RUST_LOG` overrides `default`
pub(crate) fn init_tracing(default: &str) {
    // A second init (tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .try_init();
}

/// Resolve an output format name
pub(crate) fn formatter(name: &str) -> Result<Box<dyn OutputFormatter>> {
    get_formatter(name).ok_or_else(|| {
        let known: Vec<String> = available_formats().into_iter().map(|f| f.name).collect();
        Error::Config(format!(
            "Unknown format: {} (expected one of: {})",
            name,
            known.join(", ")
        ))
    })
}

/// Print to stdout or write to a file
pub(crate) fn emit(output: &str, path: Option<&str>) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, output)?;
            eprintln!("Output written to {}", path);
        }
        None => println!("{}", output.trim_end()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_nearby() {
        let cli = Cli::try_parse_from([
            "hobbyhub-nearby",
            "nearby",
            "--lat",
            "40.71",
            "--lng",
            "-74.0",
            "--radius",
            "5",
            "--category",
            "music",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Nearby(_)));
    }

    #[test]
    fn test_unknown_formatter() {
        assert!(formatter("text").is_ok());
        assert!(matches!(formatter("gpx"), Err(Error::Config(_))));
    }

    #[test]
    fn test_emit_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.txt");
        emit("hello\n", path.to_str()).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello\n");
    }
}
