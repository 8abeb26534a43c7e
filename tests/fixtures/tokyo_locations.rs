//! Central Tokyo locations for realistic fixtures.
//!
//! Coordinates are approximate building entrances taken from OpenStreetMap.

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }
}

/// Home-visit clinic used as the depot.
pub const CLINIC: Location = Location::new("Kanda Home Clinic", 35.6918, 139.7709);

/// Patient homes and care facilities within a few kilometres of the clinic.
pub const PATIENTS: &[Location] = &[
    Location::new("Ochanomizu", 35.6995, 139.7650),
    Location::new("Akihabara", 35.6984, 139.7731),
    Location::new("Nihonbashi", 35.6840, 139.7745),
    Location::new("Ningyocho", 35.6863, 139.7825),
    Location::new("Kudanshita", 35.6955, 139.7514),
    Location::new("Jimbocho", 35.6959, 139.7577),
    Location::new("Yushima", 35.7077, 139.7699),
    Location::new("Asakusabashi", 35.6972, 139.7862),
    Location::new("Otemachi", 35.6863, 139.7638),
    Location::new("Kayabacho", 35.6797, 139.7799),
];
