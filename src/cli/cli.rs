use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Find the closest masaajid, musallahs and madaaris", long_about = None)]
pub struct Args {
    #[arg(short, long, help = "Feed URL or path to a GeoJSON file (defaults to the configured feed)")]
    feed: Option<String>,

    #[arg(short, long, help = "JSON config file")]
    config: Option<String>,

    #[arg(long, allow_hyphen_values = true, requires = "lng", help = "Device latitude in degrees")]
    lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true, requires = "lat", help = "Device longitude in degrees")]
    lng: Option<f64>,

    #[arg(long, default_value_t = false, help = "Simulate the user blocking location access")]
    deny_location: bool,

    #[arg(long, default_value_t = false, help = "Simulate a device without geolocation")]
    no_geolocation: bool,

    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(long, help = "Write places.csv and nearest.csv under this directory")]
    csv_out: Option<String>,

    #[arg(long, default_value_t = false)]
    enable_timing: bool,

    #[arg(long, default_value_t = false, help = "Start with the closest-to-you panel collapsed")]
    collapse_panel: bool,
}

impl Args {
    pub fn feed(&self) -> Option<&str> {
        self.feed.as_deref()
    }

    pub fn config(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Device position given on the command line, if both halves were supplied.
    pub fn position(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lng)
    }

    pub fn deny_location(&self) -> bool {
        self.deny_location
    }

    pub fn no_geolocation(&self) -> bool {
        self.no_geolocation
    }

    pub fn json(&self) -> bool {
        self.json
    }

    pub fn csv_out(&self) -> Option<&str> {
        self.csv_out.as_deref()
    }

    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }

    pub fn collapse_panel(&self) -> bool {
        self.collapse_panel
    }
}
