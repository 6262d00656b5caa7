use std::path::{Path, PathBuf};
use std::error::Error;
use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::analysis::nearest::NearestResult;
use crate::models::place::Place;
use crate::utils::logging::{self, OperationCategory};

#[derive(Debug, Serialize)]
struct PlaceRow<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    place_type: String,
    lat: f64,
    lng: f64,
    address: &'a str,
    website: &'a str,
    marker_color: &'static str,
    directions_url: String,
}

#[derive(Debug, Serialize)]
struct NearestRow<'a> {
    rank: usize,
    id: &'a str,
    name: &'a str,
    distance_km: String,
    directions_url: String,
}

/// Writes the place directory and nearest list to a timestamped directory.
pub struct CsvExporter {
    output_dir: PathBuf,
    timestamp: String,
}

impl CsvExporter {
    /// Create a new exporter under `output_dir/<timestamp>`.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let full_path = output_dir.as_ref().join(&timestamp);
        std::fs::create_dir_all(&full_path)?;

        Ok(Self {
            output_dir: full_path,
            timestamp,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Export every ingested place, in feed order
    pub fn export_places(&self, places: &[Place]) -> Result<PathBuf, Box<dyn Error>> {
        let _timing = logging::start_timing("export_places", OperationCategory::Export);
        let path = self.output_dir.join("places.csv");
        let mut writer = csv::Writer::from_path(&path)?;

        for place in places {
            writer.serialize(PlaceRow {
                id: &place.id,
                name: &place.name,
                place_type: place.place_type.to_string(),
                lat: place.lat,
                lng: place.lng,
                address: place.address.as_deref().unwrap_or(""),
                website: place.website.as_deref().unwrap_or(""),
                marker_color: place.place_type.marker_color(),
                directions_url: place.directions_url(),
            })?;
        }
        writer.flush()?;

        info!(rows = places.len(), path = %path.display(), "Exported places");
        Ok(path)
    }

    /// Export the nearest list with display distances
    pub fn export_nearest(&self, nearest: &[NearestResult]) -> Result<PathBuf, Box<dyn Error>> {
        let _timing = logging::start_timing("export_nearest", OperationCategory::Export);
        let path = self.output_dir.join("nearest.csv");
        let mut writer = csv::Writer::from_path(&path)?;

        for (index, result) in nearest.iter().enumerate() {
            writer.serialize(NearestRow {
                rank: index + 1,
                id: &result.place.id,
                name: &result.place.name,
                distance_km: format!("{:.1}", result.distance_km),
                directions_url: result.place.directions_url(),
            })?;
        }
        writer.flush()?;

        info!(rows = nearest.len(), path = %path.display(), "Exported nearest places");
        Ok(path)
    }
}
