//! Platform position providers

use crate::config::LocationConfig;
use crate::coord::Coordinate;
use crate::error::Result;
use crate::geo::get_ip_locator;
use crate::geo::ip_location::IpLocator;

/// Source of position fixes
pub trait PositionProvider: Send + Sync {
    /// Ask the platform for location access; true if granted
    fn request_permission(&self) -> impl std::future::Future<Output = bool> + Send;

    /// Obtain a fresh fix
    fn current_position(&self) -> impl std::future::Future<Output = Result<Coordinate>> + Send;
}

/// Coarse position from the public IP address
///
/// There is no permission prompt for an IP lookup, so access is always granted.
#[derive(Debug, Default)]
pub struct IpPositionProvider {
    locator: IpLocator,
}

impl IpPositionProvider {
    pub fn new(locator: IpLocator) -> Self {
        Self { locator }
    }
}

impl PositionProvider for IpPositionProvider {
    async fn request_permission(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<Coordinate> {
        Ok(self.locator.locate().await?.coordinate)
    }
}

/// A configured, unchanging position
#[derive(Debug, Clone, Copy)]
pub struct FixedPositionProvider {
    coordinate: Coordinate,
}

impl FixedPositionProvider {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

impl PositionProvider for FixedPositionProvider {
    async fn request_permission(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<Coordinate> {
        Ok(self.coordinate)
    }
}

/// Provider chosen by the `[location]` config section
///
/// A configured latitude/longitude pins the position; otherwise it comes
/// from the IP address.
#[derive(Debug)]
pub enum ConfiguredProvider {
    Fixed(FixedPositionProvider),
    Ip(IpPositionProvider),
}

impl ConfiguredProvider {
    pub fn from_config(config: &LocationConfig) -> Self {
        match (config.latitude, config.longitude) {
            (Some(latitude), Some(longitude)) => {
                Self::Fixed(FixedPositionProvider::new(Coordinate::new(latitude, longitude)))
            }
            _ => Self::Ip(IpPositionProvider::new(get_ip_locator())),
        }
    }
}

impl PositionProvider for ConfiguredProvider {
    async fn request_permission(&self) -> bool {
        match self {
            Self::Fixed(provider) => provider.request_permission().await,
            Self::Ip(provider) => provider.request_permission().await,
        }
    }

    async fn current_position(&self) -> Result<Coordinate> {
        match self {
            Self::Fixed(provider) => provider.current_position().await,
            Self::Ip(provider) => provider.current_position().await,
        }
    }
}
