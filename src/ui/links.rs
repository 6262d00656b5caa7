use crate::config::constants::DIRECTIONS_BASE_URL;
use crate::data::poi::Coordinate;

/// External navigation target for a position. Not validated further.
pub fn directions_url(coordinate: &Coordinate) -> String {
    format!("{}{},{}", DIRECTIONS_BASE_URL, coordinate.lat, coordinate.lng)
}

/// Kilometres with one decimal place, as shown in the "closest to you" list.
pub fn format_distance_km(distance_km: f64) -> String {
    format!("{:.1} km", distance_km)
}
