//! Wall-clock windows to integer-minute offsets from the depot start.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;
use crate::stop::Stop;

/// Admissible arrival interval in minutes relative to depot departure.
///
/// Offsets may be negative: a window that opened before the depot did means
/// the stop is available as soon as it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub earliest: i64,
    pub latest: i64,
}

impl TimeWindow {
    pub fn new(earliest: i64, latest: i64) -> Self {
        Self { earliest, latest }
    }

    pub fn contains(&self, minute: i64) -> bool {
        minute >= self.earliest && minute <= self.latest
    }

    pub fn is_empty(&self) -> bool {
        self.earliest > self.latest
    }
}

/// How a stop's service duration relates to its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceWindowPolicy {
    /// The visit must begin inside the window; service may run past it.
    #[default]
    ArrivalWithinWindow,
    /// Service must end by the window's latest instant, so the latest
    /// arrival is pulled earlier by the service duration.
    ServiceWithinWindow,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindowDeriver {
    pub policy: ServiceWindowPolicy,
}

impl TimeWindowDeriver {
    pub fn new(policy: ServiceWindowPolicy) -> Self {
        Self { policy }
    }

    /// One window per node: the depot first, then `stops` in order.
    ///
    /// The depot's window is `[0, minutes(depot.latest - start)]`.
    pub fn derive(
        &self,
        start: NaiveDateTime,
        depot: &Stop,
        stops: &[Stop],
    ) -> Result<Vec<TimeWindow>, InvalidInputError> {
        let depot_latest = minutes_between(start, depot.latest);
        if depot_latest < 0 {
            return Err(InvalidInputError::DepotWindowClosed {
                latest: depot_latest,
            });
        }

        let mut windows = Vec::with_capacity(stops.len() + 1);
        windows.push(TimeWindow::new(0, depot_latest));

        for (offset, stop) in stops.iter().enumerate() {
            let window = self.stop_window(start, stop);
            if window.is_empty() {
                return Err(InvalidInputError::InvertedWindow {
                    index: offset + 1,
                    name: stop.name.clone(),
                    earliest: window.earliest,
                    latest: window.latest,
                });
            }
            windows.push(window);
        }

        Ok(windows)
    }

    fn stop_window(&self, start: NaiveDateTime, stop: &Stop) -> TimeWindow {
        let earliest = minutes_between(start, stop.earliest);
        let latest = minutes_between(start, stop.latest);
        let latest = match self.policy {
            ServiceWindowPolicy::ArrivalWithinWindow => latest,
            ServiceWindowPolicy::ServiceWithinWindow => latest - i64::from(stop.service_minutes),
        };
        TimeWindow::new(earliest, latest)
    }
}

/// Whole minutes from `from` to `to`, truncated toward zero.
pub fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_minutes()
}
