//! URL output formatter

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::OutputFormatter;
use crate::search::SearchResult;

/// URL formatter - outputs a map URL for the top result
pub struct UrlFormatter;

impl UrlFormatter {
    /// Format URL with optional provider override
    pub fn format_with_provider(
        &self,
        results: &[SearchResult],
        config: &Config,
        provider: Option<&str>,
    ) -> Result<String> {
        let top = results
            .first()
            .ok_or_else(|| Error::NotFound("no results to link".to_string()))?;
        let coordinate = top.coordinate();
        config.format_url(provider, coordinate.latitude, coordinate.longitude)
    }
}

impl OutputFormatter for UrlFormatter {
    fn name(&self) -> &str {
        "url"
    }

    fn description(&self) -> &str {
        "Map URL for the top result"
    }

    fn format(&self, results: &[SearchResult], config: &Config) -> Result<String> {
        self.format_with_provider(results, config, None)
    }
}
