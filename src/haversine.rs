//! Haversine duration provider (fallback when no routing service is reachable).
//!
//! Uses great-circle distance to estimate travel time.
//! Less accurate than a road network but always available.

use crate::error::DistanceProviderError;
use crate::stop::LocationKey;
use crate::traits::DistanceProvider;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Estimates travel time from straight-line distance at an assumed speed.
///
/// Only coordinate keys are supported; addresses need a geocoding provider.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_lng / 2.0).sin().powi(2);

        EARTH_RADIUS_KM * 2.0 * a.sqrt().asin()
    }

    fn km_to_seconds(&self, km: f64) -> u64 {
        (km / self.speed_kmh * 3600.0).round() as u64
    }

    fn coordinates(keys: &[LocationKey]) -> Result<Vec<(f64, f64)>, DistanceProviderError> {
        keys.iter()
            .map(|key| {
                key.lat_lng()
                    .ok_or_else(|| DistanceProviderError::UnsupportedLocation(key.to_string()))
            })
            .collect()
    }
}

impl DistanceProvider for HaversineMatrix {
    fn batch_durations(
        &self,
        origins: &[LocationKey],
        destinations: &[LocationKey],
    ) -> Result<Vec<Vec<u64>>, DistanceProviderError> {
        let origins = Self::coordinates(origins)?;
        let destinations = Self::coordinates(destinations)?;

        Ok(origins
            .iter()
            .map(|&from| {
                destinations
                    .iter()
                    .map(|&to| self.km_to_seconds(Self::haversine_km(from, to)))
                    .collect()
            })
            .collect())
    }

    /// No per-call limit beyond memory.
    fn max_batch_size(&self) -> usize {
        usize::MAX
    }
}
