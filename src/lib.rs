// Module declarations for the nearest-place map core

// Configuration modules
pub mod config {
    pub mod constants;
    pub mod map_config;
}

// Model definitions
pub mod models {
    pub mod place;
}

// Data loaders
pub mod data {
    pub mod poi;
    pub mod feed_loader;
}

// Device geolocation
pub mod location {
    pub mod provider;
    pub mod acquirer;
}

// Proximity analysis
pub mod analysis {
    pub mod nearest;
}

// Map viewport and highlight layer
pub mod viewport {
    pub mod bounds;
    pub mod controller;
}

// Presentation-facing helpers
pub mod ui {
    pub mod panel;
    pub mod links;
}

// Session orchestration
pub mod core {
    pub mod session;
}

// Utility functions
pub mod utils {
    pub mod logging;
    pub mod csv_export;
}

// CLI interface
pub mod cli {
    pub mod cli;
}

// Re-export commonly used types
pub use crate::analysis::nearest::{find_nearest, NearestResult};
pub use crate::config::map_config::MapConfig;
pub use crate::core::session::{MapSession, RenderSnapshot};
pub use crate::data::poi::{Coordinate, UserPosition};
pub use crate::models::place::{Place, PlaceType};
