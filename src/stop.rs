//! Stop records as read from the stop store.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Identifier of a stop in the stop store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StopId(pub String);

impl StopId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a stop is, in whatever form the distance provider understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKey {
    /// Free-form postal address, geocoded by the provider.
    Address(String),
    Coordinates { lat: f64, lng: f64 },
}

impl LocationKey {
    pub fn address(address: impl Into<String>) -> Self {
        Self::Address(address.into())
    }

    pub fn coordinates(lat: f64, lng: f64) -> Self {
        Self::Coordinates { lat, lng }
    }

    /// Returns `(lat, lng)` when the key is a coordinate pair.
    pub fn lat_lng(&self) -> Option<(f64, f64)> {
        match self {
            Self::Coordinates { lat, lng } => Some((*lat, *lng)),
            Self::Address(_) => None,
        }
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => f.write_str(address),
            Self::Coordinates { lat, lng } => write!(f, "{:.6},{:.6}", lat, lng),
        }
    }
}

/// A place to visit, with the time it takes to serve it and the wall-clock
/// interval in which the visit may begin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub location: LocationKey,
    /// Time spent on site, in minutes.
    pub service_minutes: u32,
    pub earliest: NaiveDateTime,
    pub latest: NaiveDateTime,
}

impl Stop {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: LocationKey,
        service_minutes: u32,
        earliest: NaiveDateTime,
        latest: NaiveDateTime,
    ) -> Self {
        Self {
            id: StopId::new(id),
            name: name.into(),
            location,
            service_minutes,
            earliest,
            latest,
        }
    }
}
