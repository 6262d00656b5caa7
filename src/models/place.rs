use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::config::constants::SCHOOL_STYLE_TOKENS;
use crate::data::poi::{Coordinate, POI};
use crate::ui::links::directions_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceType {
    Masjid,
    Musallah,
    Madrasah,
}

impl PlaceType {
    /// Classifies a feed style-reference token.
    ///
    /// The feed only distinguishes schools (orange pins) from everything else, so
    /// `Musallah` is never produced here.
    pub fn from_style_token(token: &str) -> Self {
        let token = token.to_lowercase();
        if SCHOOL_STYLE_TOKENS.iter().any(|marker| token.contains(marker)) {
            PlaceType::Madrasah
        } else {
            PlaceType::Masjid
        }
    }

    pub fn marker_color(&self) -> &'static str {
        match self {
            PlaceType::Masjid => "#0ea5e9",
            PlaceType::Musallah => "#a855f7",
            PlaceType::Madrasah => "#eab308",
        }
    }
}

impl fmt::Display for PlaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaceType::Masjid => "Masjid",
            PlaceType::Musallah => "Musallah",
            PlaceType::Madrasah => "Madrasah",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for PlaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "masjid" => Ok(PlaceType::Masjid),
            "musallah" => Ok(PlaceType::Musallah),
            "madrasah" => Ok(PlaceType::Madrasah),
            other => Err(format!("Unknown place type: {}", other)),
        }
    }
}

/// One facility from the feed. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub place_type: PlaceType,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl Place {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    pub fn directions_url(&self) -> String {
        directions_url(&self.coordinate())
    }
}

impl POI for Place {
    fn get_coordinate(&self) -> Coordinate {
        self.coordinate()
    }

    fn get_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn school_tokens_classify_as_madrasah() {
        assert_eq!(PlaceType::from_style_token("#icon-1899-F57C00"), PlaceType::Madrasah);
        assert_eq!(PlaceType::from_style_token("orange-school"), PlaceType::Madrasah);
        assert_eq!(PlaceType::from_style_token("Madrasah"), PlaceType::Madrasah);
    }

    #[test]
    fn everything_else_defaults_to_masjid() {
        assert_eq!(PlaceType::from_style_token("#icon-1899-0288D1"), PlaceType::Masjid);
        assert_eq!(PlaceType::from_style_token("Musallah"), PlaceType::Masjid);
        assert_eq!(PlaceType::from_style_token(""), PlaceType::Masjid);
    }

    #[test]
    fn parses_type_names() {
        assert_eq!("musallah".parse::<PlaceType>(), Ok(PlaceType::Musallah));
        assert!("church".parse::<PlaceType>().is_err());
    }
}
