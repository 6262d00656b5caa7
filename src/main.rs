use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use masjidmap::cli::cli::Args;
use masjidmap::config::map_config::MapConfig;
use masjidmap::core::session::{MapSession, RenderSnapshot};
use masjidmap::data::feed_loader::{FileFeed, HttpFeed};
use masjidmap::data::poi::Coordinate;
use masjidmap::location::acquirer::RequestOrigin;
use masjidmap::location::provider::{
    FailureReason, StaticLocationProvider, UnsupportedLocationProvider,
};
use masjidmap::utils::csv_export::CsvExporter;
use masjidmap::utils::logging;
use masjidmap::viewport::controller::ViewState;

fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_logging(args.enable_timing());

    let config = match args.config() {
        Some(path) => MapConfig::load(path)?,
        None => MapConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let snapshot = runtime.block_on(run_session(&args, &config));

    if let Some(dir) = args.csv_out() {
        export_csv(dir, &snapshot)?;
    }

    if args.json() {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }

    logging::print_timing_report();
    Ok(())
}

async fn run_session(args: &Args, config: &MapConfig) -> RenderSnapshot {
    let session = MapSession::new(config);
    if args.collapse_panel() {
        session.set_panel_expanded(false);
    }

    let feed = args.feed().unwrap_or(config.feed_url.as_str()).to_string();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Loading places from {}", feed));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let provider = select_provider(args);
    let locate = async {
        match &provider {
            DeviceProvider::Static(p) => session.request_location(p, RequestOrigin::Automatic).await,
            DeviceProvider::Unsupported(p) => session.request_location(p, RequestOrigin::Automatic).await,
        }
    };

    // Ingestion and acquisition proceed independently of each other
    if is_http_feed(&feed) {
        let source = HttpFeed::new(feed.clone());
        tokio::join!(session.load_places(&source), locate);
    } else {
        let source = FileFeed::new(feed.clone());
        tokio::join!(session.load_places(&source), locate);
    }

    spinner.finish_and_clear();

    let snapshot = session.snapshot();
    session.dispose();
    snapshot
}

fn is_http_feed(feed: &str) -> bool {
    feed.starts_with("http://") || feed.starts_with("https://")
}

enum DeviceProvider {
    Static(StaticLocationProvider),
    Unsupported(UnsupportedLocationProvider),
}

fn select_provider(args: &Args) -> DeviceProvider {
    if args.no_geolocation() {
        return DeviceProvider::Unsupported(UnsupportedLocationProvider);
    }
    if args.deny_location() {
        return DeviceProvider::Static(StaticLocationProvider::failing(FailureReason::PermissionDenied));
    }
    match args.position() {
        Some((lat, lng)) => DeviceProvider::Static(StaticLocationProvider::at(Coordinate::new(lat, lng))),
        None => {
            warn!("No device position given, location lookup will fail");
            DeviceProvider::Static(StaticLocationProvider::failing(FailureReason::Other))
        }
    }
}

fn export_csv(dir: &str, snapshot: &RenderSnapshot) -> Result<()> {
    let exporter = CsvExporter::new(dir)
        .map_err(|e| anyhow::anyhow!("Failed to create export directory {}: {}", dir, e))?;

    let nearest: Vec<_> = snapshot.nearest
        .iter()
        .map(|entry| masjidmap::NearestResult { place: entry.place.clone(), distance_km: entry.distance_km })
        .collect();

    exporter.export_places(&snapshot.places)
        .map_err(|e| anyhow::anyhow!("Failed to export places: {}", e))?;
    exporter.export_nearest(&nearest)
        .map_err(|e| anyhow::anyhow!("Failed to export nearest places: {}", e))?;

    println!("CSV export {} written to: {}", exporter.timestamp(), exporter.output_dir().display());
    Ok(())
}

fn print_snapshot(snapshot: &RenderSnapshot) {
    println!("Masjid & Musallah Map");
    println!("Places loaded: {}", snapshot.places.len());

    match &snapshot.location.position {
        Some(position) => println!("You are here: {:.5}, {:.5}", position.lat, position.lng),
        None => println!("Location: {}", snapshot.location.state.label()),
    }
    if let Some(message) = &snapshot.location.message {
        println!("  {}", message);
        if snapshot.location.retry_offered {
            println!("  (retry available)");
        }
    }

    if !snapshot.nearest.is_empty() {
        println!("\nClosest to you{}", if snapshot.panel_expanded { ":" } else { " (collapsed)" });
        if snapshot.panel_expanded {
            for entry in &snapshot.nearest {
                println!("  {}. {} [{}] - {} away", entry.rank, entry.place.name, entry.place.place_type, entry.distance_label);
                if let Some(address) = &entry.place.address {
                    println!("     {}", address);
                }
                println!("     Directions: {}", entry.directions_url);
            }
        }
    }

    match snapshot.view {
        ViewState::Centered { center, zoom } => {
            println!("\nViewport: centered on {:.4}, {:.4} at zoom {}", center.lat, center.lng, zoom);
        },
        ViewState::Fitted { bounds } => {
            println!(
                "\nViewport: fitted to S {:.4}, W {:.4}, N {:.4}, E {:.4} ({} highlighted)",
                bounds.south, bounds.west, bounds.north, bounds.east, snapshot.highlights.len()
            );
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_scheme_selects_source() {
        assert!(is_http_feed("https://example.org/locations.json"));
        assert!(is_http_feed("http://localhost:3000/locations.json"));
        assert!(!is_http_feed("data/locations.json"));
    }

    #[test]
    fn session_runs_against_a_file_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.json");
        std::fs::write(
            &path,
            r#"{"type": "FeatureCollection", "features": [
                {"geometry": {"type": "Point", "coordinates": [-79.40, 43.71]}, "properties": {"name": "Midtown"}}
            ]}"#,
        ).unwrap();

        let path_arg = path.to_string_lossy().to_string();
        let args = Args::try_parse_from(["masjidmap", "--feed", &path_arg, "--lat", "43.7", "--lng", "-79.4"]).unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let snapshot = runtime.block_on(run_session(&args, &MapConfig::default()));

        assert_eq!(snapshot.places.len(), 1);
        assert_eq!(snapshot.nearest.len(), 1);
        assert_eq!(snapshot.nearest[0].place.name, "Midtown");
    }
}
