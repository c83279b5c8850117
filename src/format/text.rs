//! Human-readable text output formatter

use crate::config::Config;
use crate::error::Result;
use crate::format::OutputFormatter;
use crate::search::SearchResult;
use crate::store::NearbyItem;

/// Text formatter - one line per result
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn name(&self) -> &str {
        "text"
    }

    fn description(&self) -> &str {
        "Human-readable text"
    }

    fn format(&self, results: &[SearchResult], _config: &Config) -> Result<String> {
        if results.is_empty() {
            return Ok("No results\n".to_string());
        }

        let mut output = String::new();
        for (index, result) in results.iter().enumerate() {
            let tag = if result.is_marker() { "marker" } else { "place" };
            let coordinate = result.coordinate();
            output.push_str(&format!(
                "{:>2}. [{}] {} ({:.6}, {:.6})\n",
                index + 1,
                tag,
                result.label(),
                coordinate.latitude,
                coordinate.longitude
            ));
            if let SearchResult::Marker(marker) = result {
                if !marker.description.is_empty() {
                    output.push_str(&format!("    {}\n", marker.description));
                }
            }
        }
        Ok(output)
    }
}

/// Text table for a nearby query response
pub fn nearby_table(items: &[NearbyItem]) -> String {
    if items.is_empty() {
        return "Nothing nearby\n".to_string();
    }

    let mut output = String::new();
    for item in items {
        output.push_str(&format!(
            "{:>8.2} km  {:<12} {}\n",
            item.distance,
            item.category.as_str(),
            item.title
        ));
        if let Some(address) = &item.location.formatted_address {
            output.push_str(&format!("{:>13}{}\n", "", address));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use crate::format::testing::sample_results;
    use crate::store::schema::HobbyCategory;
    use crate::store::GeoPoint;
    use uuid::Uuid;

    #[test]
    fn test_text_format() {
        let output = TextFormatter
            .format(&sample_results(), &Config::default())
            .unwrap();

        let lines: Vec<_> = output.lines().collect();
        assert!(lines[0].contains("[marker] Chess Club"));
        assert!(lines[1].contains("Tuesdays at the library"));
        assert!(lines[2].contains("[place] Chess Street, Brooklyn"));
    }

    #[test]
    fn test_text_empty() {
        let output = TextFormatter.format(&[], &Config::default()).unwrap();
        assert_eq!(output, "No results\n");
    }

    #[test]
    fn test_nearby_table() {
        let items = vec![NearbyItem {
            id: Uuid::new_v4(),
            title: "Open Mic".to_string(),
            description: String::new(),
            category: HobbyCategory::Music,
            distance: 1.234,
            location: GeoPoint::new(Coordinate::new(40.71, -74.0), Some("12 Bleecker St".to_string())),
        }];

        let output = nearby_table(&items);
        assert!(output.contains("1.23 km"));
        assert!(output.contains("music"));
        assert!(output.contains("Open Mic"));
        assert!(output.contains("12 Bleecker St"));
        assert_eq!(nearby_table(&[]), "Nothing nearby\n");
    }
}
