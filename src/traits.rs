//! Collaborator seams of the planner.
//!
//! These are intentionally minimal. Concrete apps implement them for their
//! own storage and routing backends.

use std::collections::HashMap;

use crate::error::DistanceProviderError;
use crate::stop::{LocationKey, Stop, StopId};

/// Largest block edge most providers accept (10 x 10 = 100 elements).
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Provides pairwise travel durations between locations.
///
/// A single call is bounded to `max_batch_size()` origins by
/// `max_batch_size()` destinations; larger problems are split by
/// [`TimeMatrixBuilder`](crate::matrix::TimeMatrixBuilder).
pub trait DistanceProvider {
    /// Travel seconds, `result[i][j]` from `origins[i]` to `destinations[j]`.
    ///
    /// Failures are reported, never silently zeroed.
    fn batch_durations(
        &self,
        origins: &[LocationKey],
        destinations: &[LocationKey],
    ) -> Result<Vec<Vec<u64>>, DistanceProviderError>;

    fn max_batch_size(&self) -> usize {
        DEFAULT_BATCH_SIZE
    }
}

impl<P: DistanceProvider + ?Sized> DistanceProvider for &P {
    fn batch_durations(
        &self,
        origins: &[LocationKey],
        destinations: &[LocationKey],
    ) -> Result<Vec<Vec<u64>>, DistanceProviderError> {
        (**self).batch_durations(origins, destinations)
    }

    fn max_batch_size(&self) -> usize {
        (**self).max_batch_size()
    }
}

/// Read-only source of stop records. The planner never writes back.
pub trait StopStore {
    fn stop(&self, id: &StopId) -> Option<Stop>;
}

impl StopStore for HashMap<StopId, Stop> {
    fn stop(&self, id: &StopId) -> Option<Stop> {
        self.get(id).cloned()
    }
}

impl StopStore for [Stop] {
    fn stop(&self, id: &StopId) -> Option<Stop> {
        self.iter().find(|stop| &stop.id == id).cloned()
    }
}
