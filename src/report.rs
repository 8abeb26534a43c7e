//! Per-stop arrival intervals and the serializable solve response.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::error::SolveError;
use crate::model::CumulativeBound;
use crate::search::Solution;
use crate::stop::{Stop, StopId};

/// One visited position of the circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopVisit {
    pub stop_id: StopId,
    pub name: String,
    /// Matrix index of the node.
    pub node: usize,
    /// Minutes after the start time.
    pub earliest_arrival: i64,
    pub latest_arrival: i64,
    /// Elapsed minutes when this position is reached.
    pub cumulative_minutes: i64,
    pub earliest_time: NaiveDateTime,
    pub latest_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteReport {
    /// Depot first and last.
    pub visits: Vec<StopVisit>,
    /// Elapsed minutes at the return to the depot.
    pub total_minutes: i64,
    /// End minus start of the circuit, the minimized objective.
    pub span_minutes: i64,
}

/// Reads a [`Solution`] back into stop terms.
pub struct SolutionReporter<'a> {
    nodes: Vec<&'a Stop>,
    start_time: NaiveDateTime,
}

impl<'a> SolutionReporter<'a> {
    /// `nodes` must be indexed the same way as the cost matrix.
    pub fn new(nodes: Vec<&'a Stop>, start_time: NaiveDateTime) -> Self {
        Self { nodes, start_time }
    }

    pub fn report(&self, solution: &Solution) -> RouteReport {
        let visits: Vec<StopVisit> = solution
            .assignment
            .nodes()
            .iter()
            .zip(&solution.bounds)
            .map(|(&node, bound)| self.visit(node, bound))
            .collect();

        let total_minutes = solution.bounds.last().map(|bound| bound.min).unwrap_or(0);

        RouteReport {
            visits,
            total_minutes,
            span_minutes: solution.cost.span,
        }
    }

    fn visit(&self, node: usize, bound: &CumulativeBound) -> StopVisit {
        let stop = self.nodes[node];
        StopVisit {
            stop_id: stop.id.clone(),
            name: stop.name.clone(),
            node,
            earliest_arrival: bound.min,
            latest_arrival: bound.max,
            cumulative_minutes: bound.min,
            earliest_time: self.start_time + Duration::minutes(bound.min),
            latest_time: self.start_time + Duration::minutes(bound.max),
        }
    }
}

impl fmt::Display for RouteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((last, rest)) = self.visits.split_last() else {
            return writeln!(f, "empty route");
        };
        for visit in rest {
            writeln!(
                f,
                "{} ~ {} @ {} ->",
                visit.earliest_time, visit.latest_time, visit.name
            )?;
        }
        writeln!(
            f,
            "From {} To {} @ {}",
            last.earliest_time, last.latest_time, last.name
        )?;
        writeln!(f, "Time of the route: {} min", self.total_minutes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEntry {
    pub stop_id: StopId,
    pub earliest_arrival: i64,
    pub latest_arrival: i64,
    pub cumulative_minutes: i64,
}

/// Wire shape of a solve outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolveResponse {
    Route {
        route: Vec<RouteEntry>,
        total_minutes: i64,
    },
    Infeasible {
        error: String,
        diagnostic_matrix: Vec<Vec<i64>>,
    },
    Rejected {
        error: String,
    },
}

impl From<&RouteReport> for SolveResponse {
    fn from(report: &RouteReport) -> Self {
        SolveResponse::Route {
            route: report
                .visits
                .iter()
                .map(|visit| RouteEntry {
                    stop_id: visit.stop_id.clone(),
                    earliest_arrival: visit.earliest_arrival,
                    latest_arrival: visit.latest_arrival,
                    cumulative_minutes: visit.cumulative_minutes,
                })
                .collect(),
            total_minutes: report.total_minutes,
        }
    }
}

impl From<&SolveError> for SolveResponse {
    fn from(error: &SolveError) -> Self {
        match error {
            SolveError::Infeasible(infeasible) => SolveResponse::Infeasible {
                error: infeasible.to_string(),
                diagnostic_matrix: infeasible.matrix.rows(),
            },
            other => SolveResponse::Rejected {
                error: other.to_string(),
            },
        }
    }
}

impl From<Result<RouteReport, SolveError>> for SolveResponse {
    fn from(result: Result<RouteReport, SolveError>) -> Self {
        match &result {
            Ok(report) => report.into(),
            Err(error) => error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InfeasibleReason, InfeasibleRouteError};
    use crate::matrix::CostMatrix;
    use crate::model::RouteCost;
    use crate::search::{FirstSolutionStrategy, RouteAssignment};
    use crate::stop::LocationKey;
    use crate::windows::TimeWindow;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid time")
    }

    fn stops() -> Vec<Stop> {
        vec![
            Stop::new("d", "Depot", LocationKey::address("depot"), 0, at(9, 0), at(18, 0)),
            Stop::new("a", "Clinic A", LocationKey::address("a"), 5, at(9, 10), at(10, 0)),
        ]
    }

    fn solution() -> Solution {
        let assignment = RouteAssignment::from_nodes(vec![0, 1, 0]);
        Solution {
            assignment,
            bounds: vec![
                CumulativeBound::point(0),
                CumulativeBound::new(10, 20),
                CumulativeBound::point(30),
            ],
            cost: RouteCost {
                span: 20,
                end: 30,
                arc_sum: 30,
            },
            strategy: FirstSolutionStrategy::PathCheapestArc,
        }
    }

    #[test]
    fn report_translates_offsets_to_wall_clock() {
        let stops = stops();
        let reporter = SolutionReporter::new(stops.iter().collect(), at(9, 0));
        let report = reporter.report(&solution());

        assert_eq!(report.visits.len(), 3);
        assert_eq!(report.visits[1].name, "Clinic A");
        assert_eq!(report.visits[1].earliest_time, at(9, 10));
        assert_eq!(report.visits[1].latest_time, at(9, 20));
        assert_eq!(report.total_minutes, 30);
        assert_eq!(report.span_minutes, 20);
    }

    #[test]
    fn display_lists_every_position() {
        let stops = stops();
        let reporter = SolutionReporter::new(stops.iter().collect(), at(9, 0));
        let text = reporter.report(&solution()).to_string();
        assert!(text.contains("2024-04-01 09:10:00 ~ 2024-04-01 09:20:00 @ Clinic A"));
        assert!(text.contains("From 2024-04-01 09:30:00 To 2024-04-01 09:30:00 @ Depot"));
        assert!(text.ends_with("Time of the route: 30 min\n"));
    }

    #[test]
    fn infeasible_response_carries_matrix() {
        let error = SolveError::from(InfeasibleRouteError {
            reason: InfeasibleReason::NoFeasibleCircuit,
            matrix: CostMatrix::from_rows(vec![vec![0, 3], vec![4, 0]]).expect("matrix"),
            windows: vec![TimeWindow::new(0, 10), TimeWindow::new(0, 1)],
        });
        match SolveResponse::from(&error) {
            SolveResponse::Infeasible {
                diagnostic_matrix, ..
            } => assert_eq!(diagnostic_matrix, vec![vec![0, 3], vec![4, 0]]),
            other => panic!("unexpected response {:?}", other),
        }
    }
}
