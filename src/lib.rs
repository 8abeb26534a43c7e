//! tsptw-planner core
//!
//! Single-vehicle routing with time windows: build a travel-time matrix from
//! a distance provider, find a circuit through every stop that respects each
//! stop's window, and report the feasible arrival interval at every stop.

pub mod error;
pub mod google;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod osrm;
pub mod report;
pub mod search;
pub mod solver;
pub mod stop;
pub mod traits;
pub mod windows;

pub use error::{
    DistanceProviderError, InfeasibleReason, InfeasibleRouteError, InternalInvariantError,
    InvalidInputError, SolveError,
};
pub use report::{RouteReport, SolveResponse};
pub use solver::{MAX_STOPS, SolveOptions, SolveRequest, solve, solve_matrix};
pub use stop::{LocationKey, Stop, StopId};
