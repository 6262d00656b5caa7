use serde::Serialize;
use crate::config::constants::NEAREST_K;
use crate::data::poi::{UserPosition, POI};
use crate::models::place::Place;
use crate::ui::links::format_distance_km;
use crate::utils::logging::{self, OperationCategory};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestResult {
    pub place: Place,
    pub distance_km: f64,
}

impl NearestResult {
    pub fn distance_label(&self) -> String {
        format_distance_km(self.distance_km)
    }
}

/// The `k` places closest to `user`, ascending by haversine distance.
///
/// Ties keep ingestion order. Empty when there is no position or no places.
pub fn find_nearest(user: Option<&UserPosition>, places: &[Place], k: usize) -> Vec<NearestResult> {
    let _timing = logging::start_timing("find_nearest", OperationCategory::NearestSearch);

    let Some(user) = user else {
        return Vec::new();
    };
    if places.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(usize, f64)> = places
        .iter()
        .enumerate()
        .map(|(index, place)| (index, user.distance_to(&place.get_coordinate())))
        .collect();

    // sort_by is stable, which is what keeps equal distances in feed order
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

    ranked
        .into_iter()
        .take(k)
        .map(|(index, distance_km)| NearestResult {
            place: places[index].clone(),
            distance_km,
        })
        .collect()
}

pub fn nearest_three(user: Option<&UserPosition>, places: &[Place]) -> Vec<NearestResult> {
    find_nearest(user, places, NEAREST_K)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::poi::Coordinate;
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

    #[test]
    fn empty_without_position_or_places() {
        let places = vec![place("a", 43.7, -79.4)];
        assert!(nearest_three(None, &places).is_empty());
        assert!(nearest_three(Some(&Coordinate::new(43.7, -79.4)), &[]).is_empty());
    }

    #[test]
    fn length_is_min_of_three_and_place_count() {
        let user = Coordinate::new(43.7, -79.4);
        for n in 0..6 {
            let places: Vec<Place> = (0..n)
                .map(|i| place(&i.to_string(), 43.7 + i as f64 * 0.01, -79.4))
                .collect();
            assert_eq!(nearest_three(Some(&user), &places).len(), n.min(3));
        }
    }

    #[test]
    fn sorted_ascending_by_distance() {
        let user = Coordinate::new(43.7, -79.4);
        let places = vec![
            place("far", 44.5, -79.4),
            place("near", 43.71, -79.4),
            place("mid", 43.9, -79.4),
            place("farthest", 45.0, -79.4),
        ];

        let nearest = nearest_three(Some(&user), &places);
        let ids: Vec<&str> = nearest.iter().map(|r| r.place.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(nearest.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn ties_keep_ingestion_order() {
        let user = Coordinate::new(0.0, 0.0);
        // Four points at exactly the same distance, plus one farther away
        let places = vec![
            place("east", 0.0, 1.0),
            place("far", 5.0, 5.0),
            place("west", 0.0, -1.0),
            place("east-again", 0.0, 1.0),
            place("west-again", 0.0, -1.0),
        ];

        let ids: Vec<String> = nearest_three(Some(&user), &places)
            .into_iter()
            .map(|r| r.place.id)
            .collect();
        assert_eq!(ids, vec!["east", "west", "east-again"]);
    }

    #[test]
    fn does_not_mutate_inputs() {
        let user = Coordinate::new(43.7, -79.4);
        let places = vec![place("b", 44.0, -79.4), place("a", 43.8, -79.4)];
        let before = places.clone();
        let _ = nearest_three(Some(&user), &places);
        assert_eq!(places, before);
    }
}
