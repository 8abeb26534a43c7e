//! Error kinds surfaced by a solve.

use std::fmt;

use thiserror::Error;

use crate::matrix::CostMatrix;
use crate::model::CumulativeBound;
use crate::stop::StopId;
use crate::windows::TimeWindow;

/// Any failure of the solve pipeline.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    DistanceProvider(#[from] DistanceProviderError),
    #[error(transparent)]
    Infeasible(#[from] InfeasibleRouteError),
    #[error(transparent)]
    InternalInvariant(#[from] InternalInvariantError),
}

/// Rejected before any matrix call or search is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInputError {
    #[error("no stops to route")]
    EmptyStops,
    #[error("{count} stops requested, at most {max} are supported")]
    TooManyStops { count: usize, max: usize },
    #[error("stop {index} ({name}) has an inverted window: {earliest} > {latest} minutes")]
    InvertedWindow {
        index: usize,
        name: String,
        earliest: i64,
        latest: i64,
    },
    #[error("depot closes {latest} minutes after the start time")]
    DepotWindowClosed { latest: i64 },
    #[error("unknown stop {0}")]
    UnknownStop(StopId),
    #[error("cost matrix is not square")]
    MatrixNotSquare,
    #[error("cost matrix has {matrix} rows but {windows} time windows were given")]
    MatrixSizeMismatch { matrix: usize, windows: usize },
    #[error("negative cost {value} from {from} to {to}")]
    NegativeCost { from: usize, to: usize, value: i64 },
    #[error("depot index {depot} is out of range for {size} nodes")]
    DepotOutOfRange { depot: usize, size: usize },
}

/// A distance provider call failed; the partial matrix is discarded.
#[derive(Debug, Error)]
pub enum DistanceProviderError {
    #[error("distance provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("distance provider returned {code}: {message}")]
    Status { code: String, message: String },
    #[error("malformed distance provider response: {0}")]
    MalformedResponse(String),
    #[error("location {0} is not supported by this provider")]
    UnsupportedLocation(String),
    #[error("no route from {origin} to {destination}")]
    Unreachable { origin: String, destination: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfeasibleReason {
    NoFeasibleCircuit,
    TimedOut,
    Cancelled,
}

impl fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoFeasibleCircuit => "no circuit satisfies every time window",
            Self::TimedOut => "search deadline expired before a circuit was found",
            Self::Cancelled => "search was cancelled",
        };
        f.write_str(text)
    }
}

/// No circuit was found. Carries the inputs so the caller can see which
/// windows were too tight.
#[derive(Debug, Clone, Error)]
#[error("route is infeasible: {reason}")]
pub struct InfeasibleRouteError {
    pub reason: InfeasibleReason,
    pub matrix: CostMatrix,
    pub windows: Vec<TimeWindow>,
}

/// A cumulative bound emptied after construction had accepted the route.
#[derive(Debug, Clone, Error)]
#[error("internal invariant violated during {stage}: empty bound at route position {position}")]
pub struct InternalInvariantError {
    pub stage: &'static str,
    pub route: Vec<usize>,
    pub position: usize,
    pub bounds: Vec<CumulativeBound>,
}
