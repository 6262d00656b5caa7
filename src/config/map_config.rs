use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::config::constants::{
    ALL_PLACES_BOUNDS_PADDING,
    DEFAULT_FEED_URL,
    FALLBACK_CENTER_LAT,
    FALLBACK_CENTER_LNG,
    FALLBACK_ZOOM,
    NEAREST_BOUNDS_PADDING,
    NEAREST_K,
    RECENTER_ZOOM,
};
use crate::data::poi::Coordinate;
use crate::location::provider::GeolocationOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub feed_url: String,
    pub fallback_center: Coordinate,
    pub fallback_zoom: u8,
    pub recenter_zoom: u8,
    pub nearest_k: usize,
    /// Share of the span added to each side when fitting user + nearest places.
    pub nearest_padding: f64,
    /// Share of the span added to each side when fitting every place.
    pub all_places_padding: f64,
    pub geolocation: GeolocationOptions,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            fallback_center: Coordinate::new(FALLBACK_CENTER_LAT, FALLBACK_CENTER_LNG),
            fallback_zoom: FALLBACK_ZOOM,
            recenter_zoom: RECENTER_ZOOM,
            nearest_k: NEAREST_K,
            nearest_padding: NEAREST_BOUNDS_PADDING,
            all_places_padding: ALL_PLACES_BOUNDS_PADDING,
            geolocation: GeolocationOptions::default(),
        }
    }
}

impl MapConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: MapConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        if !config.fallback_center.is_valid() {
            anyhow::bail!(
                "Fallback center ({}, {}) is outside WGS84 ranges",
                config.fallback_center.lat,
                config.fallback_center.lng
            );
        }

        if config.nearest_padding < 0.0 || config.all_places_padding < 0.0 {
            anyhow::bail!("Viewport padding must not be negative");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"feed_url": "https://example.org/locations.json", "geolocation": {{"timeout_ms": 8000}}}}"#).unwrap();

        let config = MapConfig::load(file.path()).unwrap();
        assert_eq!(config.feed_url, "https://example.org/locations.json");
        assert_eq!(config.geolocation.timeout_ms, 8000);
        assert_eq!(config.geolocation.max_age_ms, 30_000);
        assert_eq!(config.fallback_zoom, FALLBACK_ZOOM);
        assert_eq!(config.nearest_k, 3);
        assert_eq!(config.nearest_padding, 0.2);
    }

    #[test]
    fn rejects_negative_padding() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"all_places_padding": -0.1}}"#).unwrap();
        assert!(MapConfig::load(file.path()).is_err());
    }

    #[test]
    fn rejects_out_of_range_fallback_center() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_center": {{"lat": 123.0, "lng": 0.0}}}}"#).unwrap();
        assert!(MapConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(MapConfig::load("/nonexistent/masjidmap.json").is_err());
    }
}
