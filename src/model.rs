//! Route model: a chain of cumulative time variables.
//!
//! Each route position holds one cumulative variable, the elapsed minutes
//! since depot departure when that position is reached. Consecutive
//! positions `u -> v` are linked by
//!
//! ```text
//! cumul[k] + cost[u][v] <= cumul[k + 1] <= cumul[k] + cost[u][v] + slack_max
//! ```
//!
//! and every position is bounded by its node's window intersected with
//! `[0, horizon]`. Because the constraints form a chain, one forward and one
//! backward pass reach the fixpoint: every value left in a bound extends to
//! a full feasible assignment.

use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;
use crate::matrix::CostMatrix;
use crate::windows::TimeWindow;

/// Feasible interval of one cumulative variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeBound {
    pub min: i64,
    pub max: i64,
}

impl CumulativeBound {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn point(value: i64) -> Self {
        Self::new(value, value)
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn is_pinned(&self) -> bool {
        self.min == self.max
    }
}

/// Propagation emptied the bound at `position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub position: usize,
    pub bounds: Vec<CumulativeBound>,
}

/// Objective of a complete circuit. Ordered lexicographically: span first,
/// then the earliest return, then the plain arc sum as a tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RouteCost {
    pub span: i64,
    pub end: i64,
    pub arc_sum: i64,
}

#[derive(Debug, Clone)]
pub struct RouteModel<'a> {
    matrix: &'a CostMatrix,
    windows: &'a [TimeWindow],
    depot: usize,
    slack_max: i64,
    horizon: i64,
}

impl<'a> RouteModel<'a> {
    /// The depot window's latest offset is the horizon of every cumulative
    /// variable and the default waiting allowance.
    pub fn new(
        matrix: &'a CostMatrix,
        windows: &'a [TimeWindow],
        depot: usize,
    ) -> Result<Self, InvalidInputError> {
        if matrix.size() != windows.len() {
            return Err(InvalidInputError::MatrixSizeMismatch {
                matrix: matrix.size(),
                windows: windows.len(),
            });
        }
        if depot >= windows.len() {
            return Err(InvalidInputError::DepotOutOfRange {
                depot,
                size: windows.len(),
            });
        }
        for from in 0..matrix.size() {
            for to in 0..matrix.size() {
                let value = matrix.get(from, to);
                if from != to && value < 0 {
                    return Err(InvalidInputError::NegativeCost { from, to, value });
                }
            }
        }
        for (index, window) in windows.iter().enumerate() {
            if index != depot && window.is_empty() {
                return Err(InvalidInputError::InvertedWindow {
                    index,
                    name: format!("node {}", index),
                    earliest: window.earliest,
                    latest: window.latest,
                });
            }
        }

        let horizon = windows[depot].latest.max(0);
        Ok(Self {
            matrix,
            windows,
            depot,
            slack_max: horizon,
            horizon,
        })
    }

    /// Overrides the waiting allowance per arc.
    pub fn with_slack_max(mut self, slack_max: i64) -> Self {
        self.slack_max = slack_max.max(0);
        self
    }

    pub fn node_count(&self) -> usize {
        self.windows.len()
    }

    pub fn depot(&self) -> usize {
        self.depot
    }

    pub fn slack_max(&self) -> i64 {
        self.slack_max
    }

    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    pub fn matrix(&self) -> &CostMatrix {
        self.matrix
    }

    pub fn windows(&self) -> &[TimeWindow] {
        self.windows
    }

    pub fn transit(&self, from: usize, to: usize) -> i64 {
        self.matrix.get(from, to)
    }

    /// Initial domain of the cumulative variable of a visit to `node`.
    pub fn node_bound(&self, node: usize) -> CumulativeBound {
        let window = self.windows[node];
        CumulativeBound::new(window.earliest.max(0), window.latest.min(self.horizon))
    }

    pub fn initial_bounds(&self, route: &[usize]) -> Vec<CumulativeBound> {
        route.iter().map(|&node| self.node_bound(node)).collect()
    }

    /// Tightest bounds for `route` (open path or closed circuit).
    pub fn propagate(&self, route: &[usize]) -> Result<Vec<CumulativeBound>, Conflict> {
        let mut bounds = self.initial_bounds(route);
        self.propagate_bounds(route, &mut bounds)?;
        Ok(bounds)
    }

    /// Forward then backward pass over `bounds`, in place.
    pub fn propagate_bounds(
        &self,
        route: &[usize],
        bounds: &mut [CumulativeBound],
    ) -> Result<(), Conflict> {
        debug_assert_eq!(route.len(), bounds.len());
        if let Some(position) = bounds.iter().position(CumulativeBound::is_empty) {
            return Err(Conflict {
                position,
                bounds: bounds.to_vec(),
            });
        }

        for k in 0..route.len().saturating_sub(1) {
            let transit = self.transit(route[k], route[k + 1]);
            let (head, tail) = bounds.split_at_mut(k + 1);
            let (prev, next) = (&head[k], &mut tail[0]);
            next.min = next.min.max(prev.min.saturating_add(transit));
            next.max = next
                .max
                .min(prev.max.saturating_add(transit).saturating_add(self.slack_max));
            if next.is_empty() {
                return Err(Conflict {
                    position: k + 1,
                    bounds: bounds.to_vec(),
                });
            }
        }

        for k in (0..route.len().saturating_sub(1)).rev() {
            let transit = self.transit(route[k], route[k + 1]);
            let (head, tail) = bounds.split_at_mut(k + 1);
            let (prev, next) = (&mut head[k], &tail[0]);
            prev.max = prev.max.min(next.max.saturating_sub(transit));
            prev.min = prev
                .min
                .max(next.min.saturating_sub(transit).saturating_sub(self.slack_max));
            if prev.is_empty() {
                return Err(Conflict {
                    position: k,
                    bounds: bounds.to_vec(),
                });
            }
        }

        Ok(())
    }

    /// Fixes position `position` to `value` and re-propagates.
    pub fn pin(
        &self,
        route: &[usize],
        bounds: &mut [CumulativeBound],
        position: usize,
        value: i64,
    ) -> Result<(), Conflict> {
        let current = bounds[position];
        bounds[position] = CumulativeBound::new(current.min.max(value), current.max.min(value));
        self.propagate_bounds(route, bounds)
    }

    /// Objective of a closed circuit, or `None` if it cannot be scheduled.
    ///
    /// The earliest return `end` is the forward minimum of the last
    /// position; the span subtracts the latest departure that still allows
    /// returning at `end`.
    pub fn evaluate(&self, route: &[usize]) -> Option<RouteCost> {
        let mut bounds = self.propagate(route).ok()?;
        let last = bounds.len().checked_sub(1)?;
        let end = bounds[last].min;
        self.pin(route, &mut bounds, last, end).ok()?;
        let span = end - bounds[0].max;
        let arc_sum = route
            .windows(2)
            .map(|pair| self.transit(pair[0], pair[1]))
            .sum();
        Some(RouteCost { span, end, arc_sum })
    }

    pub fn is_feasible(&self, route: &[usize]) -> bool {
        self.propagate(route).is_ok()
    }
}
