//! Device geolocation capability.
//!
//! The browser callback API is abstracted behind [`LocationProvider`] so the acquirer
//! can be driven by a fixed position (CLI) or by scripted fakes (tests).

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::config::constants::{GEOLOCATION_HIGH_ACCURACY, GEOLOCATION_MAX_AGE_MS, GEOLOCATION_TIMEOUT_MS};
use crate::data::poi::Coordinate;

/// Request parameters, used only at request time and never stored with the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationOptions {
    pub high_accuracy: bool,
    pub max_age_ms: u64,
    pub timeout_ms: u64,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: GEOLOCATION_HIGH_ACCURACY,
            max_age_ms: GEOLOCATION_MAX_AGE_MS,
            timeout_ms: GEOLOCATION_TIMEOUT_MS,
        }
    }
}

impl GeolocationOptions {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// A position reported by the device, possibly served from its cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub coordinate: Coordinate,
    pub timestamp: DateTime<Utc>,
    pub accuracy_m: Option<f64>,
}

impl PositionFix {
    pub fn now(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            timestamp: Utc::now(),
            accuracy_m: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    PermissionDenied,
    Other,
}

pub trait LocationProvider: Send + Sync {
    /// Whether the device exposes a geolocation facility at all.
    fn is_supported(&self) -> bool {
        true
    }

    fn request(
        &self,
        options: &GeolocationOptions,
    ) -> impl Future<Output = Result<PositionFix, FailureReason>> + Send;

    /// Abandons an outstanding request. Later completions are ignored by the caller.
    fn cancel(&self);

    fn name(&self) -> &str;
}

/// Answers every request with the same outcome. Backs the CLI's `--lat/--lng` and
/// `--deny-location` flags.
#[derive(Debug)]
pub struct StaticLocationProvider {
    outcome: Result<Coordinate, FailureReason>,
    requests: AtomicUsize,
}

impl StaticLocationProvider {
    pub fn at(coordinate: Coordinate) -> Self {
        Self::with_outcome(Ok(coordinate))
    }

    pub fn failing(reason: FailureReason) -> Self {
        Self::with_outcome(Err(reason))
    }

    fn with_outcome(outcome: Result<Coordinate, FailureReason>) -> Self {
        Self {
            outcome,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl LocationProvider for StaticLocationProvider {
    async fn request(&self, _options: &GeolocationOptions) -> Result<PositionFix, FailureReason> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.outcome.map(PositionFix::now)
    }

    // Answers synchronously, nothing to abandon
    fn cancel(&self) {}

    fn name(&self) -> &str {
        "static"
    }
}

/// A device without any geolocation facility.
#[derive(Debug, Default)]
pub struct UnsupportedLocationProvider;

impl LocationProvider for UnsupportedLocationProvider {
    fn is_supported(&self) -> bool {
        false
    }

    async fn request(&self, _options: &GeolocationOptions) -> Result<PositionFix, FailureReason> {
        Err(FailureReason::Other)
    }

    fn cancel(&self) {}

    fn name(&self) -> &str {
        "unsupported"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_browser_request() {
        let options = GeolocationOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.max_age(), Duration::from_secs(30));
        assert_eq!(options.timeout(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn static_provider_reports_fixed_outcome() {
        let provider = StaticLocationProvider::at(Coordinate::new(43.7, -79.4));
        let fix = provider.request(&GeolocationOptions::default()).await.unwrap();
        assert_eq!(fix.coordinate, Coordinate::new(43.7, -79.4));
        assert_eq!(provider.request_count(), 1);

        let denied = StaticLocationProvider::failing(FailureReason::PermissionDenied);
        assert_eq!(
            denied.request(&GeolocationOptions::default()).await,
            Err(FailureReason::PermissionDenied)
        );
    }
}
