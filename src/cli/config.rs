//! Config command handler
//!
//! View and modify configuration settings.

use crate::config::Config;
use crate::error::{Error, Result};
use clap::Args;

/// Config command arguments
#[derive(Args)]
pub struct ConfigArgs {
    /// Configuration key (e.g., "nearby.max_results")
    pub key: Option<String>,

    /// Value to set (if not provided, shows current value)
    pub value: Option<String>,

    /// Show config file path
    #[arg(long)]
    pub path: bool,

    /// Reset config to defaults
    #[arg(long)]
    pub reset: bool,
}

/// Run the config command
pub fn run(args: ConfigArgs) -> Result<()> {
    if args.path {
        println!("{}", Config::config_path()?.display());
        return Ok(());
    }

    if args.reset {
        Config::default().save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;

    match (args.key.as_deref(), args.value.as_deref()) {
        (None, None) => show_all_config(&config),
        (Some(key), None) => println!("{}", lookup(&config, key)?),
        (Some(key), Some(value)) => {
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key, value);
        }
        (None, Some(_)) => {
            return Err(Error::Config("Must specify a key to set a value".to_string()))
        }
    }

    Ok(())
}

/// Value of a dotted key, or an error listing the known keys
fn lookup(config: &Config, key: &str) -> Result<String> {
    config.get(key).ok_or_else(|| {
        Error::Config(format!(
            "Unknown config key: {}\n\nAvailable keys:\n  {}",
            key,
            Config::available_keys().join("\n  ")
        ))
    })
}

/// Display all configuration values
fn show_all_config(config: &Config) {
    println!("[server]");
    println!("host = \"{}\"", config.server.host);
    println!("port = {}", config.server.port);
    println!();

    println!("[geocoding]");
    println!("base_url = \"{}\"", config.geocoding.base_url);
    println!("user_agent = \"{}\"", config.geocoding.user_agent);
    println!("timeout_secs = {}", config.geocoding.timeout_secs);
    println!("result_limit = {}", config.geocoding.result_limit);
    println!();

    println!("[search]");
    println!("debounce_ms = {}", config.search.debounce_ms);
    println!("min_query_len = {}", config.search.min_query_len);
    println!();

    println!("[location]");
    println!("default_radius_meters = {}", config.location.default_radius_meters);
    println!("update_interval_secs = {}", config.location.update_interval_secs);
    println!("fix_timeout_secs = {}", config.location.fix_timeout_secs);
    match (config.location.latitude, config.location.longitude) {
        (Some(lat), Some(lng)) => {
            println!("latitude = {}", lat);
            println!("longitude = {}", lng);
        }
        _ => println!("# latitude/longitude not set, using IP location"),
    }
    println!();

    println!("[nearby]");
    println!("default_radius_km = {}", config.nearby.default_radius_km);
    println!("max_results = {}", config.nearby.max_results);
    if let Some(path) = &config.nearby.seed_path {
        println!("seed_path = \"{}\"", path.display());
    }
    println!();

    println!("[auth]");
    if config.auth.jwt_secret.is_empty() {
        println!("jwt_secret = \"\" # not configured");
    } else {
        println!("jwt_secret = \"***\" # configured");
    }
    println!("access_ttl_secs = {}", config.auth.access_ttl_secs);
    println!("refresh_ttl_secs = {}", config.auth.refresh_ttl_secs);
    println!();

    println!("[api]");
    println!("base_url = \"{}\"", config.api.base_url);
    println!();

    println!("[url]");
    println!("default = \"{}\"", config.url.default);
    println!();

    println!("[url.providers]");
    let mut providers: Vec<_> = config.url.providers.iter().collect();
    providers.sort();
    for (name, template) in providers {
        println!("{} = \"{}\"", name, template);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let config = Config::default();
        assert_eq!(lookup(&config, "nearby.max_results").unwrap(), "50");

        let err = lookup(&config, "defaults.backend").unwrap_err().to_string();
        assert!(err.contains("Unknown config key"));
        assert!(err.contains("search.debounce_ms"));
    }
}
