use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use crate::config::constants::{
    MSG_LOCATION_DENIED,
    MSG_LOCATION_FAILED,
    MSG_LOCATION_PROMPT,
    MSG_LOCATION_UNSUPPORTED,
};
use crate::data::poi::UserPosition;
use crate::utils::logging::{self, OperationCategory};
use super::provider::{FailureReason, GeolocationOptions, LocationProvider, PositionFix};

/// `Idle → Requesting → {Acquired, Denied, Failed}`. Nothing is terminal: every
/// state can be left through a new request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AcquisitionState {
    Idle,
    Requesting,
    Acquired { position: UserPosition },
    Denied { message: String },
    Failed { message: String, retry_offered: bool },
}

impl AcquisitionState {
    pub fn message(&self) -> Option<&str> {
        match self {
            AcquisitionState::Denied { message } | AcquisitionState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether the UI should show a manual retry action.
    pub fn retry_offered(&self) -> bool {
        match self {
            AcquisitionState::Denied { .. } => true,
            AcquisitionState::Failed { retry_offered, .. } => *retry_offered,
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AcquisitionState::Idle => "idle",
            AcquisitionState::Requesting => "requesting",
            AcquisitionState::Acquired { .. } => "acquired",
            AcquisitionState::Denied { .. } => "denied",
            AcquisitionState::Failed { .. } => "failed",
        }
    }
}

/// Who triggered the request. The on-load attempt uses a softer prompt on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    Automatic,
    Manual,
}

/// Proof that a request was started; completions must present the matching ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    attempt: u64,
    origin: RequestOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginRequest {
    Started(RequestTicket),
    AlreadyInFlight,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcquisitionOutcome {
    /// New position; the map should recenter on it at `zoom`.
    Acquired { position: UserPosition, zoom: u8 },
    Denied,
    Failed,
    Unsupported,
    /// A request was already outstanding, or retry is not on offer.
    Ignored,
    /// The result arrived after its owner went away or was superseded.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct LocationAcquirer {
    state: AcquisitionState,
    position: Option<UserPosition>,
    options: GeolocationOptions,
    recenter_zoom: u8,
    attempt: u64,
}

impl LocationAcquirer {
    pub fn new(options: GeolocationOptions, recenter_zoom: u8) -> Self {
        Self {
            state: AcquisitionState::Idle,
            position: None,
            options,
            recenter_zoom,
            attempt: 0,
        }
    }

    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    /// Last successfully acquired position. Survives later failed attempts.
    pub fn position(&self) -> Option<UserPosition> {
        self.position
    }

    pub fn options(&self) -> &GeolocationOptions {
        &self.options
    }

    pub fn is_requesting(&self) -> bool {
        self.state == AcquisitionState::Requesting
    }

    /// Moves to `Requesting` unless a request is already outstanding.
    pub fn begin(&mut self, origin: RequestOrigin, supported: bool) -> BeginRequest {
        if self.is_requesting() {
            debug!("Ignoring location request while another is outstanding");
            return BeginRequest::AlreadyInFlight;
        }

        if !supported {
            info!("Geolocation is not available on this device");
            self.state = AcquisitionState::Failed {
                message: MSG_LOCATION_UNSUPPORTED.to_string(),
                retry_offered: false,
            };
            return BeginRequest::Unsupported;
        }

        self.attempt += 1;
        self.state = AcquisitionState::Requesting;
        debug!(attempt = self.attempt, ?origin, "Requesting device location");
        BeginRequest::Started(RequestTicket { attempt: self.attempt, origin })
    }

    /// Applies the provider's answer for `ticket`.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        result: Result<PositionFix, FailureReason>,
    ) -> AcquisitionOutcome {
        if ticket.attempt != self.attempt || !self.is_requesting() {
            debug!(attempt = ticket.attempt, "Dropping stale location result");
            return AcquisitionOutcome::Discarded;
        }

        let result = result.and_then(|fix| self.accept_fix(fix));

        match result {
            Ok(position) => {
                info!(lat = position.lat, lng = position.lng, "Device location acquired");
                self.position = Some(position);
                self.state = AcquisitionState::Acquired { position };
                AcquisitionOutcome::Acquired { position, zoom: self.recenter_zoom }
            },
            Err(FailureReason::PermissionDenied) => {
                info!("Location permission denied");
                self.state = AcquisitionState::Denied { message: MSG_LOCATION_DENIED.to_string() };
                AcquisitionOutcome::Denied
            },
            Err(FailureReason::Other) => {
                let message = match ticket.origin {
                    RequestOrigin::Automatic => MSG_LOCATION_PROMPT,
                    RequestOrigin::Manual => MSG_LOCATION_FAILED,
                };
                self.state = AcquisitionState::Failed { message: message.to_string(), retry_offered: true };
                AcquisitionOutcome::Failed
            },
        }
    }

    fn accept_fix(&self, fix: PositionFix) -> Result<UserPosition, FailureReason> {
        if !fix.coordinate.is_valid() {
            warn!(lat = fix.coordinate.lat, lng = fix.coordinate.lng, "Provider returned an invalid position");
            return Err(FailureReason::Other);
        }

        let age = Utc::now().signed_duration_since(fix.timestamp);
        // Ages beyond chrono's range mean "accept any cached fix"
        let max_age = chrono::Duration::from_std(self.options.max_age()).unwrap_or(chrono::Duration::MAX);
        if age > max_age {
            warn!(age_ms = age.num_milliseconds(), max_age_ms = self.options.max_age_ms, "Rejecting stale cached position");
            return Err(FailureReason::Other);
        }

        Ok(fix.coordinate)
    }

    /// Standalone request cycle: begin, ask the provider, complete.
    pub async fn request<P: LocationProvider>(&mut self, provider: &P, origin: RequestOrigin) -> AcquisitionOutcome {
        let ticket = match self.begin(origin, provider.is_supported()) {
            BeginRequest::Started(ticket) => ticket,
            BeginRequest::AlreadyInFlight => return AcquisitionOutcome::Ignored,
            BeginRequest::Unsupported => return AcquisitionOutcome::Unsupported,
        };
        let result = acquire_position(provider, &self.options).await;
        self.complete(ticket, result)
    }
}

/// Asks the provider for a fix, enforcing the request timeout here rather than
/// trusting the provider to honor it.
pub async fn acquire_position<P: LocationProvider>(
    provider: &P,
    options: &GeolocationOptions,
) -> Result<PositionFix, FailureReason> {
    let _timing = logging::start_async_timing("acquire_position", OperationCategory::Geolocation);

    match tokio::time::timeout(options.timeout(), provider.request(options)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(provider = provider.name(), timeout_ms = options.timeout_ms, "Location request timed out");
            provider.cancel();
            Err(FailureReason::Other)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::data::poi::Coordinate;
    use crate::location::provider::{StaticLocationProvider, UnsupportedLocationProvider};

    struct StaleProvider;

    impl LocationProvider for StaleProvider {
        async fn request(&self, _options: &GeolocationOptions) -> Result<PositionFix, FailureReason> {
            Ok(PositionFix {
                coordinate: Coordinate::new(43.7, -79.4),
                timestamp: Utc::now() - chrono::Duration::minutes(5),
                accuracy_m: Some(20.0),
            })
        }

        fn cancel(&self) {}

        fn name(&self) -> &str {
            "stale"
        }
    }

    fn acquirer() -> LocationAcquirer {
        LocationAcquirer::new(GeolocationOptions::default(), 12)
    }

    #[tokio::test]
    async fn success_produces_position_and_recenter_signal() {
        let mut acquirer = acquirer();
        let provider = StaticLocationProvider::at(Coordinate::new(43.7, -79.4));

        let outcome = acquirer.request(&provider, RequestOrigin::Automatic).await;
        assert_eq!(outcome, AcquisitionOutcome::Acquired { position: Coordinate::new(43.7, -79.4), zoom: 12 });
        assert_eq!(acquirer.position(), Some(Coordinate::new(43.7, -79.4)));
        assert_eq!(acquirer.state().label(), "acquired");
        assert_eq!(acquirer.state().message(), None);
    }

    #[tokio::test]
    async fn permission_denied_offers_retry_with_guidance() {
        let mut acquirer = acquirer();
        let provider = StaticLocationProvider::failing(FailureReason::PermissionDenied);

        assert_eq!(acquirer.request(&provider, RequestOrigin::Manual).await, AcquisitionOutcome::Denied);
        assert_eq!(acquirer.state().message(), Some(MSG_LOCATION_DENIED));
        assert!(acquirer.state().retry_offered());
        assert_eq!(acquirer.position(), None);
    }

    #[tokio::test]
    async fn other_failure_message_depends_on_origin() {
        let provider = StaticLocationProvider::failing(FailureReason::Other);

        let mut automatic = acquirer();
        assert_eq!(automatic.request(&provider, RequestOrigin::Automatic).await, AcquisitionOutcome::Failed);
        assert_eq!(automatic.state().message(), Some(MSG_LOCATION_PROMPT));

        let mut manual = acquirer();
        manual.request(&provider, RequestOrigin::Manual).await;
        assert_eq!(manual.state().message(), Some(MSG_LOCATION_FAILED));
        assert!(manual.state().retry_offered());
    }

    #[tokio::test]
    async fn unsupported_device_fails_without_requesting() {
        let mut acquirer = acquirer();
        let outcome = acquirer.request(&UnsupportedLocationProvider, RequestOrigin::Automatic).await;

        assert_eq!(outcome, AcquisitionOutcome::Unsupported);
        assert_eq!(acquirer.state().message(), Some(MSG_LOCATION_UNSUPPORTED));
        assert!(!acquirer.state().retry_offered());
    }

    #[tokio::test]
    async fn stale_cached_fix_is_rejected() {
        let mut acquirer = acquirer();
        assert_eq!(acquirer.request(&StaleProvider, RequestOrigin::Manual).await, AcquisitionOutcome::Failed);
        assert_eq!(acquirer.position(), None);
    }

    #[tokio::test]
    async fn huge_max_age_accepts_fresh_fix() {
        let options = GeolocationOptions { max_age_ms: u64::MAX, ..GeolocationOptions::default() };
        let mut acquirer = LocationAcquirer::new(options, 12);
        let provider = StaticLocationProvider::at(Coordinate::new(43.7, -79.4));

        let outcome = acquirer.request(&provider, RequestOrigin::Automatic).await;
        assert!(matches!(outcome, AcquisitionOutcome::Acquired { .. }));
    }

    #[test]
    fn second_begin_while_requesting_is_ignored() {
        let mut acquirer = acquirer();
        let first = acquirer.begin(RequestOrigin::Automatic, true);
        assert!(matches!(first, BeginRequest::Started(_)));
        assert_eq!(acquirer.begin(RequestOrigin::Manual, true), BeginRequest::AlreadyInFlight);
    }

    #[test]
    fn completion_with_superseded_ticket_is_discarded() {
        let mut acquirer = acquirer();
        let BeginRequest::Started(ticket) = acquirer.begin(RequestOrigin::Manual, true) else {
            panic!("expected request to start");
        };
        let fix = PositionFix::now(Coordinate::new(1.0, 1.0));
        assert!(matches!(acquirer.complete(ticket, Ok(fix)), AcquisitionOutcome::Acquired { .. }));
        assert_eq!(acquirer.complete(ticket, Ok(fix)), AcquisitionOutcome::Discarded);
    }

    #[test]
    fn failed_retry_keeps_previous_position() {
        let mut acquirer = acquirer();
        let BeginRequest::Started(first) = acquirer.begin(RequestOrigin::Automatic, true) else {
            panic!("expected request to start");
        };
        acquirer.complete(first, Ok(PositionFix::now(Coordinate::new(43.7, -79.4))));

        let BeginRequest::Started(second) = acquirer.begin(RequestOrigin::Manual, true) else {
            panic!("expected request to start");
        };
        acquirer.complete(second, Err(FailureReason::Other));
        assert_eq!(acquirer.state().label(), "failed");
        assert_eq!(acquirer.position(), Some(Coordinate::new(43.7, -79.4)));
    }

    struct NeverAnswers {
        cancelled: std::sync::atomic::AtomicBool,
    }

    impl LocationProvider for NeverAnswers {
        async fn request(&self, _options: &GeolocationOptions) -> Result<PositionFix, FailureReason> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(FailureReason::Other)
        }

        fn cancel(&self) {
            self.cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "never"
        }
    }

    #[tokio::test]
    async fn timeout_is_enforced_and_provider_cancelled() {
        let provider = NeverAnswers { cancelled: std::sync::atomic::AtomicBool::new(false) };
        let options = GeolocationOptions { timeout_ms: 20, ..GeolocationOptions::default() };
        let mut acquirer = LocationAcquirer::new(options, 12);

        assert_eq!(acquirer.request(&provider, RequestOrigin::Manual).await, AcquisitionOutcome::Failed);
        assert!(provider.cancelled.load(std::sync::atomic::Ordering::SeqCst));
    }
}
