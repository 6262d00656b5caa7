use std::future::Future;
use std::path::PathBuf;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::config::constants::{
    CACHE_BUST_PARAM, DEFAULT_PLACE_NAME, ID_KEYS, STYLE_KEYS, WEBSITE_KEYS,
};
use crate::data::poi::Coordinate;
use crate::models::place::{Place, PlaceType};
use crate::utils::logging::{self, FeedIngestType, OperationCategory};

#[derive(Debug)]
pub enum FeedLoadError {
    HttpError(reqwest::Error),
    StatusError(u16),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    NotACollection,
}

impl From<reqwest::Error> for FeedLoadError {
    fn from(err: reqwest::Error) -> Self {
        FeedLoadError::HttpError(err)
    }
}

impl From<std::io::Error> for FeedLoadError {
    fn from(err: std::io::Error) -> Self {
        FeedLoadError::IoError(err)
    }
}

impl From<serde_json::Error> for FeedLoadError {
    fn from(err: serde_json::Error) -> Self {
        FeedLoadError::JsonError(err)
    }
}

impl std::fmt::Display for FeedLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedLoadError::HttpError(e) => write!(f, "HTTP error: {}", e),
            FeedLoadError::StatusError(code) => write!(f, "Feed responded with status {}", code),
            FeedLoadError::IoError(e) => write!(f, "IO error: {}", e),
            FeedLoadError::JsonError(e) => write!(f, "JSON error: {}", e),
            FeedLoadError::NotACollection => write!(f, "Feed is not a feature collection"),
        }
    }
}

impl std::error::Error for FeedLoadError {}

/// Somewhere a point-feature collection can be read from.
pub trait FeedSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<String, FeedLoadError>> + Send;

    fn describe(&self) -> String;
}

/// Feed served over HTTP. Every fetch is cache-busted.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    url: String,
    client: reqwest::Client,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl FeedSource for HttpFeed {
    async fn fetch(&self) -> Result<String, FeedLoadError> {
        let url = cache_busted_url(&self.url, Utc::now().timestamp_millis());
        debug!(%url, "Requesting feed");

        let response = self.client
            .get(&url)
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedLoadError::StatusError(status.as_u16()));
        }

        Ok(response.text().await?)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Feed stored on disk, e.g. a `locations.json` exported alongside the site.
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FileFeed {
    async fn fetch(&self) -> Result<String, FeedLoadError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Appends `v=<millis>` so intermediaries never serve a stale feed.
pub fn cache_busted_url(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, CACHE_BUST_PARAM, millis)
}

/// Fetches and normalizes the feed. Never fails: any error is logged and yields an
/// empty place set so the map can still render.
pub async fn ingest<S: FeedSource>(source: &S) -> Vec<Place> {
    let fetched = {
        let _timing = logging::start_async_timing("ingest_fetch",
            OperationCategory::FeedIngest { subcategory: FeedIngestType::Fetch });
        source.fetch().await
    };

    let result = fetched.and_then(|body| {
        let _timing = logging::start_timing("ingest_parse",
            OperationCategory::FeedIngest { subcategory: FeedIngestType::Parse });
        parse_places(&body)
    });

    match result {
        Ok(places) => places,
        Err(e) => {
            error!(source = %source.describe(), error = %e, "Failed to load place feed, continuing with no places");
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Vec<Value>,
}

/// Parses a point-feature collection into places, in feed order.
///
/// Features that are not Points, or whose coordinates are missing or out of range,
/// are dropped rather than reported.
pub fn parse_places(body: &str) -> Result<Vec<Place>, FeedLoadError> {
    let document: Value = serde_json::from_str(body)?;
    if document.get("features").map_or(true, |f| !f.is_array()) {
        return Err(FeedLoadError::NotACollection);
    }
    let collection: FeatureCollection = serde_json::from_value(document)?;

    let total = collection.features.len();
    let places: Vec<Place> = collection.features
        .iter()
        .filter_map(feature_to_place)
        .collect();

    info!(features = total, kept = places.len(), dropped = total - places.len(), "Ingested place feed");
    Ok(places)
}

fn feature_to_place(raw: &Value) -> Option<Place> {
    let feature: Feature = match serde_json::from_value(raw.clone()) {
        Ok(feature) => feature,
        Err(e) => {
            debug!(error = %e, "Skipping malformed feature");
            return None;
        }
    };

    let coordinate = point_coordinate(feature.geometry.as_ref()?)?;
    let empty = Map::new();
    let props = feature.properties.as_ref().unwrap_or(&empty);

    let id = first_string(props, ID_KEYS)
        .unwrap_or_else(|| format!("{},{}", coordinate.lat, coordinate.lng));
    let name = prop_string(props, "name").unwrap_or_else(|| DEFAULT_PLACE_NAME.to_string());
    let style_token = STYLE_KEYS
        .iter()
        .filter_map(|key| prop_string(props, key))
        .collect::<Vec<_>>()
        .join(" ");

    Some(Place {
        id,
        name,
        place_type: PlaceType::from_style_token(&style_token),
        lat: coordinate.lat,
        lng: coordinate.lng,
        address: prop_string(props, "address"),
        notes: prop_string(props, "notes"),
        website: resolve_website(props),
    })
}

fn point_coordinate(geometry: &Geometry) -> Option<Coordinate> {
    if geometry.kind != "Point" || geometry.coordinates.len() < 2 {
        return None;
    }
    // GeoJSON order is [lng, lat]
    let lng = geometry.coordinates[0].as_f64()?;
    let lat = geometry.coordinates[1].as_f64()?;
    let coordinate = Coordinate::new(lat, lng);

    if !coordinate.is_valid() {
        debug!(lat, lng, "Skipping feature with out-of-range coordinates");
        return None;
    }
    Some(coordinate)
}

fn prop_string(props: &Map<String, Value>, key: &str) -> Option<String> {
    match props.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
        },
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_string(props: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| prop_string(props, key))
}

lazy_static! {
    static ref HREF_PATTERN: Regex = Regex::new(r#"href\s*=\s*"([^"]+)""#).expect("Valid regex");
    static ref BARE_URL_PATTERN: Regex = Regex::new(r#"https://[^\s"'<>]+"#).expect("Valid regex");
}

const TRAILING_URL_PUNCTUATION: &[char] = &['.', ',', ';', ':', ')', '!', '?'];

/// Direct `website`/`url` property, else a link scraped from `description`.
fn resolve_website(props: &Map<String, Value>) -> Option<String> {
    if let Some(website) = first_string(props, WEBSITE_KEYS) {
        return Some(website);
    }

    let description = prop_string(props, "description")?;
    if let Some(captures) = HREF_PATTERN.captures(&description) {
        return Some(captures[1].to_string());
    }
    // Sentence punctuation directly after a bare link is not part of it
    BARE_URL_PATTERN
        .find(&description)
        .map(|m| m.as_str().trim_end_matches(TRAILING_URL_PUNCTUATION).to_string())
        .filter(|url| url.len() > "https://".len())
}
