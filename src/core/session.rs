//! One map view's worth of state, and the notifier that keeps it consistent.
//!
//! `MapSession` owns the place set, the location acquirer, the viewport controller
//! and the panel flag. After every input change it re-runs the same pure derivation
//! over `(places, user position)`: nearest-k first, then the viewport. Async work
//! (feed fetch, geolocation) never holds the state lock across an await, and any
//! result that resolves after [`MapSession::dispose`] is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::nearest::{find_nearest, NearestResult};
use crate::config::map_config::MapConfig;
use crate::data::feed_loader::{self, FeedSource};
use crate::data::poi::UserPosition;
use crate::location::acquirer::{
    acquire_position, AcquisitionOutcome, AcquisitionState, BeginRequest, LocationAcquirer, RequestOrigin,
};
use crate::location::provider::LocationProvider;
use crate::models::place::Place;
use crate::ui::links::directions_url;
use crate::ui::panel::PanelController;
use crate::viewport::controller::{HighlightMarker, ViewState, ViewportController, ViewportMode};

struct SessionState {
    places: Arc<Vec<Place>>,
    acquirer: LocationAcquirer,
    nearest: Vec<NearestResult>,
    viewport: ViewportController,
    panel: PanelController,
    nearest_k: usize,
}

impl SessionState {
    fn recompute(&mut self) {
        let position = self.acquirer.position();
        self.nearest = find_nearest(position.as_ref(), &self.places, self.nearest_k);
        self.viewport.update(position.as_ref(), &self.places, &self.nearest);
    }
}

#[derive(Clone)]
pub struct MapSession {
    state: Arc<Mutex<SessionState>>,
    disposed: Arc<AtomicBool>,
}

/// Entry of the "closest to you" list as handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestEntry {
    pub rank: usize,
    pub place: Place,
    pub distance_km: f64,
    pub distance_label: String,
    pub directions_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationStatus {
    pub state: AcquisitionState,
    pub message: Option<String>,
    pub retry_offered: bool,
    pub position: Option<UserPosition>,
    pub directions_url: Option<String>,
}

/// Everything the presentation layer needs to draw the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSnapshot {
    pub places: Vec<Place>,
    pub nearest: Vec<NearestEntry>,
    pub view: ViewState,
    pub viewport_mode: ViewportMode,
    pub highlights: Vec<HighlightMarker>,
    pub location: LocationStatus,
    pub panel_expanded: bool,
}

impl MapSession {
    pub fn new(config: &MapConfig) -> Self {
        let state = SessionState {
            places: Arc::new(Vec::new()),
            acquirer: LocationAcquirer::new(config.geolocation, config.recenter_zoom),
            nearest: Vec::new(),
            viewport: ViewportController::new(config),
            panel: PanelController::new(),
            nearest_k: config.nearest_k,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the owning view as gone. Outstanding operations discard their results.
    pub fn dispose(&self) {
        debug!("Disposing map session");
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Ingests the feed and replaces the place set wholesale. Returns the number of
    /// places now held, or `None` if the session was disposed before the fetch ended.
    pub async fn load_places<S: FeedSource>(&self, source: &S) -> Option<usize> {
        if self.is_disposed() {
            return None;
        }

        let places = feed_loader::ingest(source).await;

        if self.is_disposed() {
            debug!(source = %source.describe(), "Discarding feed result for disposed session");
            return None;
        }

        let count = places.len();
        {
            let mut state = self.state.lock();
            state.places = Arc::new(places);
            state.recompute();
        }
        info!(places = count, "Place set replaced");
        Some(count)
    }

    /// Replaces the place set with already-parsed places.
    pub fn set_places(&self, places: Vec<Place>) {
        let mut state = self.state.lock();
        state.places = Arc::new(places);
        state.recompute();
    }

    /// Asks the device for its position. A request while one is outstanding is ignored.
    pub async fn request_location<P: LocationProvider>(&self, provider: &P, origin: RequestOrigin) -> AcquisitionOutcome {
        if self.is_disposed() {
            return AcquisitionOutcome::Discarded;
        }

        let (ticket, options) = {
            let mut state = self.state.lock();
            match state.acquirer.begin(origin, provider.is_supported()) {
                BeginRequest::Started(ticket) => (ticket, *state.acquirer.options()),
                BeginRequest::AlreadyInFlight => return AcquisitionOutcome::Ignored,
                BeginRequest::Unsupported => {
                    state.recompute();
                    return AcquisitionOutcome::Unsupported;
                },
            }
        };

        let result = acquire_position(provider, &options).await;

        if self.is_disposed() {
            debug!(provider = provider.name(), "Discarding location result for disposed session");
            return AcquisitionOutcome::Discarded;
        }

        let mut state = self.state.lock();
        let outcome = state.acquirer.complete(ticket, result);
        if let AcquisitionOutcome::Acquired { position, zoom } = outcome {
            state.viewport.recenter(position, zoom);
        }
        if outcome != AcquisitionOutcome::Discarded {
            state.recompute();
        }
        outcome
    }

    /// The manual retry action. Only honored when the current state offers it.
    pub async fn retry_location<P: LocationProvider>(&self, provider: &P) -> AcquisitionOutcome {
        let offered = self.state.lock().acquirer.state().retry_offered();
        if !offered {
            debug!("Retry requested but not on offer");
            return AcquisitionOutcome::Ignored;
        }
        self.request_location(provider, RequestOrigin::Manual).await
    }

    pub fn toggle_panel(&self) -> bool {
        self.state.lock().panel.toggle()
    }

    pub fn set_panel_expanded(&self, expanded: bool) {
        self.state.lock().panel.set_expanded(expanded);
    }

    pub fn places(&self) -> Arc<Vec<Place>> {
        Arc::clone(&self.state.lock().places)
    }

    pub fn nearest(&self) -> Vec<NearestResult> {
        self.state.lock().nearest.clone()
    }

    pub fn user_position(&self) -> Option<UserPosition> {
        self.state.lock().acquirer.position()
    }

    pub fn location_state(&self) -> AcquisitionState {
        self.state.lock().acquirer.state().clone()
    }

    pub fn view(&self) -> ViewState {
        self.state.lock().viewport.view()
    }

    pub fn highlights(&self) -> Vec<HighlightMarker> {
        self.state.lock().viewport.highlights().to_vec()
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let state = self.state.lock();
        let acquisition = state.acquirer.state().clone();
        let position = state.acquirer.position();

        RenderSnapshot {
            places: state.places.as_ref().clone(),
            nearest: state.nearest
                .iter()
                .enumerate()
                .map(|(index, result)| NearestEntry {
                    rank: index + 1,
                    place: result.place.clone(),
                    distance_km: result.distance_km,
                    distance_label: result.distance_label(),
                    directions_url: result.place.directions_url(),
                })
                .collect(),
            view: state.viewport.view(),
            viewport_mode: state.viewport.mode(),
            highlights: state.viewport.highlights().to_vec(),
            location: LocationStatus {
                message: acquisition.message().map(str::to_string),
                retry_offered: acquisition.retry_offered(),
                state: acquisition,
                position,
                directions_url: position.as_ref().map(directions_url),
            },
            panel_expanded: state.panel.is_expanded(),
        }
    }
}
