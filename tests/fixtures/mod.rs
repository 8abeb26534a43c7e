//! Test fixtures for tsptw-planner.
//!
//! Provides:
//! - A stop builder with sensible defaults (08:45 - 19:00, no service time)
//! - A table-backed distance provider that records every block it serves
//! - Real central-Tokyo coordinates for haversine-based runs

#![allow(dead_code)]

pub mod tokyo_locations;

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};

use tsptw_planner::error::DistanceProviderError;
use tsptw_planner::stop::{LocationKey, Stop};
use tsptw_planner::traits::DistanceProvider;

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, 1)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid time")
}

/// Builder for test stops.
#[derive(Clone, Debug)]
pub struct TestStop {
    stop: Stop,
}

impl TestStop {
    /// A stop whose location key is its own id.
    pub fn new(id: &str) -> Self {
        Self {
            stop: Stop::new(id, id, LocationKey::address(id), 0, at(8, 45), at(19, 0)),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.stop.name = name.to_string();
        self
    }

    pub fn service(mut self, minutes: u32) -> Self {
        self.stop.service_minutes = minutes;
        self
    }

    pub fn window(mut self, earliest: NaiveDateTime, latest: NaiveDateTime) -> Self {
        self.stop.earliest = earliest;
        self.stop.latest = latest;
        self
    }

    pub fn at_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.stop.location = LocationKey::coordinates(lat, lng);
        self
    }

    pub fn build(self) -> Stop {
        self.stop
    }
}

/// Serves durations from a fixed table of travel seconds, keyed by address.
pub struct TableProvider {
    index: HashMap<String, usize>,
    seconds: Vec<Vec<u64>>,
    max_batch: usize,
    fail_on_call: Option<usize>,
    calls: Mutex<Vec<(usize, usize)>>,
}

impl TableProvider {
    /// `keys[i]` is the address of row/column `i` of `seconds`.
    pub fn new(keys: &[&str], seconds: Vec<Vec<u64>>) -> Self {
        Self {
            index: keys
                .iter()
                .enumerate()
                .map(|(i, key)| (key.to_string(), i))
                .collect(),
            seconds,
            max_batch: usize::MAX,
            fail_on_call: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Table given in whole minutes.
    pub fn from_minutes(keys: &[&str], minutes: Vec<Vec<u64>>) -> Self {
        let seconds = minutes
            .into_iter()
            .map(|row| row.into_iter().map(|m| m * 60).collect())
            .collect();
        Self::new(keys, seconds)
    }

    pub fn max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Fail the `n`-th call (zero based).
    pub fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }

    /// `(origins, destinations)` of every call, in call order.
    pub fn call_shapes(&self) -> Vec<(usize, usize)> {
        self.calls.lock().expect("lock").clone()
    }

    fn lookup(&self, key: &LocationKey) -> Result<usize, DistanceProviderError> {
        self.index
            .get(&key.to_string())
            .copied()
            .ok_or_else(|| DistanceProviderError::UnsupportedLocation(key.to_string()))
    }
}

impl DistanceProvider for TableProvider {
    fn batch_durations(
        &self,
        origins: &[LocationKey],
        destinations: &[LocationKey],
    ) -> Result<Vec<Vec<u64>>, DistanceProviderError> {
        let call = {
            let mut calls = self.calls.lock().expect("lock");
            calls.push((origins.len(), destinations.len()));
            calls.len() - 1
        };
        if self.fail_on_call == Some(call) {
            return Err(DistanceProviderError::Status {
                code: "UNKNOWN_ERROR".to_string(),
                message: "injected failure".to_string(),
            });
        }

        let mut block = Vec::with_capacity(origins.len());
        for origin in origins {
            let from = self.lookup(origin)?;
            let mut row = Vec::with_capacity(destinations.len());
            for destination in destinations {
                row.push(self.seconds[from][self.lookup(destination)?]);
            }
            block.push(row);
        }
        Ok(block)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch
    }
}

/// Ids `"n0"`, `"n1"`, ... for table-driven tests.
pub fn node_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("n{}", i)).collect()
}
