// Geodesy
pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LNG: f64 = -180.0;
pub const MAX_LNG: f64 = 180.0;

// Nearest-place search
pub const NEAREST_K: usize = 3;

// Viewport padding fractions (applied to each side as a share of the span)
pub const NEAREST_BOUNDS_PADDING: f64 = 0.2;
pub const ALL_PLACES_BOUNDS_PADDING: f64 = 0.1;

// Default map view (downtown Toronto)
pub const FALLBACK_CENTER_LAT: f64 = 43.6532;
pub const FALLBACK_CENTER_LNG: f64 = -79.3832;
pub const FALLBACK_ZOOM: u8 = 9;
pub const RECENTER_ZOOM: u8 = 12;

// Highlight marker styling
pub const HIGHLIGHT_RADIUS_PX: u8 = 8;
pub const HIGHLIGHT_STROKE_COLOR: &str = "#021733";
pub const HIGHLIGHT_FILL_COLOR: &str = "#ffffff";

// Geolocation request defaults
pub const GEOLOCATION_HIGH_ACCURACY: bool = true;
pub const GEOLOCATION_MAX_AGE_MS: u64 = 30_000;
pub const GEOLOCATION_TIMEOUT_MS: u64 = 10_000;

// Feed
pub const DEFAULT_FEED_URL: &str = "http://localhost:3000/locations.json";
pub const CACHE_BUST_PARAM: &str = "v";
pub const DEFAULT_PLACE_NAME: &str = "Unnamed";

// Style-reference tokens that mark a school (orange pin) in the feed.
// Matched case-insensitively as substrings.
pub const SCHOOL_STYLE_TOKENS: &[&str] = &["school", "madras", "orange", "f57c00", "ff9800", "ffa500"];

// Property keys, in lookup order
pub const ID_KEYS: &[&str] = &["id", "place_id", "name"];
pub const STYLE_KEYS: &[&str] = &["styleUrl", "style", "marker-color", "type"];
pub const WEBSITE_KEYS: &[&str] = &["website", "url"];

// Outbound links
pub const DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/?api=1&destination=";

// User-facing geolocation messages
pub const MSG_LOCATION_UNSUPPORTED: &str = "Location not supported on this device.";
pub const MSG_LOCATION_DENIED: &str =
    "Location permission is blocked. Enable it in your browser settings and try again.";
pub const MSG_LOCATION_FAILED: &str = "We couldn't get your location. Please try again.";
pub const MSG_LOCATION_PROMPT: &str = "Enable location to see the three closest masaajid near you.";
