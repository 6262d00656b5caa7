use serde::Serialize;
use tracing::debug;
use crate::analysis::nearest::NearestResult;
use crate::config::constants::{HIGHLIGHT_FILL_COLOR, HIGHLIGHT_RADIUS_PX, HIGHLIGHT_STROKE_COLOR};
use crate::config::map_config::MapConfig;
use crate::data::poi::{Coordinate, UserPosition, POI};
use crate::models::place::Place;
use crate::utils::logging::{self, OperationCategory};
use super::bounds::LatLngBounds;

/// What the map is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewState {
    /// Fixed center and zoom, either the fallback or a recenter on the user.
    Centered { center: Coordinate, zoom: u8 },
    /// Fitted to a padded region.
    Fitted { bounds: LatLngBounds },
}

/// Which branch the last recomputation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportMode {
    NearestPlaces,
    AllPlaces,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightMarker {
    pub place_id: String,
    pub coordinate: Coordinate,
    pub radius_px: u8,
    pub stroke_color: &'static str,
    pub fill_color: &'static str,
}

impl HighlightMarker {
    fn for_place(place: &Place) -> Self {
        Self {
            place_id: place.get_id().to_string(),
            coordinate: place.get_coordinate(),
            radius_px: HIGHLIGHT_RADIUS_PX,
            stroke_color: HIGHLIGHT_STROKE_COLOR,
            fill_color: HIGHLIGHT_FILL_COLOR,
        }
    }
}

/// Keeps the visible region and the highlight layer in step with session state.
///
/// The highlight layer is owned here and only exposed read-only; every update clears
/// it completely before redrawing.
#[derive(Debug, Clone)]
pub struct ViewportController {
    view: ViewState,
    mode: ViewportMode,
    highlights: Vec<HighlightMarker>,
    nearest_padding: f64,
    all_places_padding: f64,
    updates: u64,
}

impl ViewportController {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            view: ViewState::Centered {
                center: config.fallback_center,
                zoom: config.fallback_zoom,
            },
            mode: ViewportMode::Unchanged,
            highlights: Vec::new(),
            nearest_padding: config.nearest_padding,
            all_places_padding: config.all_places_padding,
            updates: 0,
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn mode(&self) -> ViewportMode {
        self.mode
    }

    pub fn highlights(&self) -> &[HighlightMarker] {
        &self.highlights
    }

    pub fn update_count(&self) -> u64 {
        self.updates
    }

    /// Centers on a freshly acquired position. A following `update` may refit.
    pub fn recenter(&mut self, position: UserPosition, zoom: u8) {
        self.view = ViewState::Centered { center: position, zoom };
    }

    /// Re-derives the view from the current inputs.
    pub fn update(
        &mut self,
        user: Option<&UserPosition>,
        places: &[Place],
        nearest: &[NearestResult],
    ) -> ViewportMode {
        let _timing = logging::start_timing("viewport_update", OperationCategory::Viewport);
        self.updates += 1;
        self.highlights.clear();

        self.mode = match user {
            Some(user) if !nearest.is_empty() => {
                let points = std::iter::once(*user)
                    .chain(nearest.iter().map(|r| r.place.get_coordinate()));
                if let Some(bounds) = LatLngBounds::from_points(points) {
                    self.view = ViewState::Fitted { bounds: bounds.pad(self.nearest_padding) };
                }
                self.highlights.extend(nearest.iter().map(|r| HighlightMarker::for_place(&r.place)));
                ViewportMode::NearestPlaces
            },
            None if !places.is_empty() => {
                if let Some(bounds) = LatLngBounds::from_points(places.iter().map(|p| p.get_coordinate())) {
                    self.view = ViewState::Fitted { bounds: bounds.pad(self.all_places_padding) };
                }
                ViewportMode::AllPlaces
            },
            _ => ViewportMode::Unchanged,
        };

        debug!(mode = ?self.mode, highlights = self.highlights.len(), "Viewport updated");
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::nearest::nearest_three;
    use crate::models::place::PlaceType;

    fn place(id: &str, lat: f64, lng: f64) -> Place {
        Place {
            id: id.to_string(),
            name: id.to_string(),
            place_type: PlaceType::Masjid,
            lat,
            lng,
            address: None,
            notes: None,
            website: None,
        }
    }

    fn sample_places() -> Vec<Place> {
        vec![
            place("a", 43.70, -79.41),
            place("b", 43.71, -79.40),
            place("c", 43.65, -79.38),
            place("d", 43.80, -79.20),
            place("e", 44.20, -78.90),
        ]
    }

    #[test]
    fn starts_at_fallback_view() {
        let config = MapConfig::default();
        let viewport = ViewportController::new(&config);
        assert_eq!(viewport.view(), ViewState::Centered { center: config.fallback_center, zoom: config.fallback_zoom });
        assert!(viewport.highlights().is_empty());
    }

    #[test]
    fn no_inputs_leave_view_alone() {
        let config = MapConfig::default();
        let mut viewport = ViewportController::new(&config);
        assert_eq!(viewport.update(None, &[], &[]), ViewportMode::Unchanged);
        assert_eq!(viewport.view(), ViewState::Centered { center: config.fallback_center, zoom: config.fallback_zoom });
    }

    #[test]
    fn all_places_mode_fits_every_place_with_tenth_padding() {
        let places = sample_places();
        let mut viewport = ViewportController::new(&MapConfig::default());

        assert_eq!(viewport.update(None, &places, &[]), ViewportMode::AllPlaces);
        let ViewState::Fitted { bounds } = viewport.view() else {
            panic!("expected fitted view");
        };

        let exact = LatLngBounds::from_points(places.iter().map(|p| p.coordinate())).unwrap();
        assert_eq!(bounds, exact.pad(0.1));
        assert!(places.iter().all(|p| bounds.contains(&p.coordinate())));
        assert!(viewport.highlights().is_empty());
    }

    #[test]
    fn nearest_mode_fits_user_and_nearest_with_fifth_padding() {
        let places = sample_places();
        let user = Coordinate::new(43.70, -79.40);
        let nearest = nearest_three(Some(&user), &places);
        let mut viewport = ViewportController::new(&MapConfig::default());

        assert_eq!(viewport.update(Some(&user), &places, &nearest), ViewportMode::NearestPlaces);
        let ViewState::Fitted { bounds } = viewport.view() else {
            panic!("expected fitted view");
        };

        let exact = LatLngBounds::from_points(
            std::iter::once(user).chain(nearest.iter().map(|r| r.place.coordinate())),
        ).unwrap();
        assert_eq!(bounds, exact.pad(0.2));
        assert!(bounds.contains(&user));
        assert!(nearest.iter().all(|r| bounds.contains(&r.place.coordinate())));
    }

    #[test]
    fn highlights_never_accumulate() {
        let places = sample_places();
        let user = Coordinate::new(43.70, -79.40);
        let nearest = nearest_three(Some(&user), &places);
        let mut viewport = ViewportController::new(&MapConfig::default());

        for _ in 0..5 {
            viewport.update(Some(&user), &places, &nearest);
            assert_eq!(viewport.highlights().len(), nearest.len());
        }
        let ids: Vec<&str> = viewport.highlights().iter().map(|m| m.place_id.as_str()).collect();
        let expected: Vec<&str> = nearest.iter().map(|r| r.place.id.as_str()).collect();
        assert_eq!(ids, expected);

        // Dropping to a single place shrinks the layer rather than leaving stale markers
        let one = vec![places[2].clone()];
        let nearest_one = nearest_three(Some(&user), &one);
        viewport.update(Some(&user), &one, &nearest_one);
        assert_eq!(viewport.highlights().len(), 1);
        assert_eq!(viewport.update_count(), 6);
    }

    #[test]
    fn recenter_then_empty_places_keeps_user_center() {
        let mut viewport = ViewportController::new(&MapConfig::default());
        let user = Coordinate::new(45.0, -75.0);
        viewport.recenter(user, 12);
        assert_eq!(viewport.update(Some(&user), &[], &[]), ViewportMode::Unchanged);
        assert_eq!(viewport.view(), ViewState::Centered { center: user, zoom: 12 });
    }
}
