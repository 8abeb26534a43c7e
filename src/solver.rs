//! End-to-end solve: stops in, reported circuit out.

use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::info;

use crate::error::{InvalidInputError, SolveError};
use crate::matrix::{CostMatrix, TimeMatrixBuilder};
use crate::model::RouteModel;
use crate::report::{RouteReport, SolutionReporter};
use crate::search::{CancellationToken, FirstSolutionStrategy, SearchEngine, SearchOptions, Solution};
use crate::stop::{Stop, StopId};
use crate::traits::{DEFAULT_BATCH_SIZE, DistanceProvider, StopStore};
use crate::windows::{ServiceWindowPolicy, TimeWindow, TimeWindowDeriver};

/// Most stops (excluding the depot) accepted in one request.
pub const MAX_STOPS: usize = 25;

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Largest block edge requested from the distance provider.
    pub batch_size: usize,
    /// Fetch matrix blocks concurrently.
    pub parallel_batches: bool,
    pub window_policy: ServiceWindowPolicy,
    /// Waiting allowed per arc; `None` uses the depot's opening span.
    pub max_waiting_minutes: Option<i64>,
    pub first_solution: FirstSolutionStrategy,
    pub local_search_iterations: usize,
    pub time_limit: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            parallel_batches: false,
            window_policy: ServiceWindowPolicy::default(),
            max_waiting_minutes: None,
            first_solution: FirstSolutionStrategy::default(),
            local_search_iterations: 100,
            time_limit: None,
            cancellation: None,
        }
    }
}

impl SolveOptions {
    fn search(&self) -> SearchOptions {
        SearchOptions {
            first_solution: self.first_solution,
            local_search_iterations: self.local_search_iterations,
            time_limit: self.time_limit,
            cancellation: self.cancellation.clone(),
        }
    }
}

/// One routing request: leave the depot at `start_time`, visit every stop,
/// come back.
#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub depot: Stop,
    pub stops: Vec<Stop>,
    pub start_time: NaiveDateTime,
}

impl SolveRequest {
    pub fn new(depot: Stop, stops: Vec<Stop>, start_time: NaiveDateTime) -> Self {
        Self {
            depot,
            stops,
            start_time,
        }
    }

    /// Resolves ids against `store`. Departure is the depot's opening time.
    pub fn from_store<S>(store: &S, depot_id: &StopId, stop_ids: &[StopId]) -> Result<Self, InvalidInputError>
    where
        S: StopStore + ?Sized,
    {
        let resolve = |id: &StopId| store.stop(id).ok_or_else(|| InvalidInputError::UnknownStop(id.clone()));
        let depot = resolve(depot_id)?;
        let stops = stop_ids.iter().map(resolve).collect::<Result<Vec<_>, _>>()?;
        let start_time = depot.earliest;
        Ok(Self::new(depot, stops, start_time))
    }

    pub fn validate(&self) -> Result<(), InvalidInputError> {
        if self.stops.is_empty() {
            return Err(InvalidInputError::EmptyStops);
        }
        if self.stops.len() > MAX_STOPS {
            return Err(InvalidInputError::TooManyStops {
                count: self.stops.len(),
                max: MAX_STOPS,
            });
        }
        Ok(())
    }

    /// Matrix node order: the depot, then the stops.
    pub fn nodes(&self) -> Vec<&Stop> {
        std::iter::once(&self.depot).chain(&self.stops).collect()
    }
}

/// Validates, builds the matrix, searches and reports.
///
/// Input is rejected before any provider call is made.
pub fn solve<P>(request: &SolveRequest, provider: &P, options: &SolveOptions) -> Result<RouteReport, SolveError>
where
    P: DistanceProvider + Sync,
{
    request.validate()?;
    let windows = TimeWindowDeriver::new(options.window_policy).derive(
        request.start_time,
        &request.depot,
        &request.stops,
    )?;

    let nodes = request.nodes();
    let matrix = TimeMatrixBuilder::new(provider)
        .batch_size(options.batch_size)
        .parallel(options.parallel_batches)
        .build(&nodes)?;

    let solution = solve_matrix(&matrix, &windows, 0, options)?;
    let report = SolutionReporter::new(nodes, request.start_time).report(&solution);
    info!(
        stops = request.stops.len(),
        strategy = ?solution.strategy,
        total_minutes = report.total_minutes,
        span_minutes = report.span_minutes,
        "route solved"
    );
    Ok(report)
}

/// Core solve on prepared data, with no provider involved.
pub fn solve_matrix(
    matrix: &CostMatrix,
    windows: &[TimeWindow],
    depot: usize,
    options: &SolveOptions,
) -> Result<Solution, SolveError> {
    let mut model = RouteModel::new(matrix, windows, depot)?;
    if let Some(slack) = options.max_waiting_minutes {
        model = model.with_slack_max(slack);
    }
    let search = options.search();
    SearchEngine::new(&model, &search).solve()
}
