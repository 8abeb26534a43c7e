//! First-solution construction, bounded local tightening and the finalizer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{InfeasibleReason, InfeasibleRouteError, InternalInvariantError, SolveError};
use crate::model::{Conflict, CumulativeBound, RouteCost, RouteModel};

/// Construction rule for the first circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstSolutionStrategy {
    /// Cheapest arc first, falling back to the other rules when it dead-ends.
    #[default]
    Automatic,
    /// From the current path end, extend by the cheapest arc that keeps the
    /// path schedulable.
    PathCheapestArc,
    /// Insert stops by increasing deadline at their cheapest feasible position.
    CheapestInsertion,
    /// Visit stops by increasing latest arrival.
    EarliestDeadline,
}

impl FirstSolutionStrategy {
    fn sequence(self) -> &'static [FirstSolutionStrategy] {
        use FirstSolutionStrategy::*;
        match self {
            Automatic => &[PathCheapestArc, CheapestInsertion, EarliestDeadline],
            PathCheapestArc => &[PathCheapestArc],
            CheapestInsertion => &[CheapestInsertion],
            EarliestDeadline => &[EarliestDeadline],
        }
    }
}

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub first_solution: FirstSolutionStrategy,
    /// Upper bound on improving moves; zero keeps the first circuit.
    pub local_search_iterations: usize,
    pub time_limit: Option<Duration>,
    pub cancellation: Option<CancellationToken>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            first_solution: FirstSolutionStrategy::Automatic,
            local_search_iterations: 100,
            time_limit: None,
            cancellation: None,
        }
    }
}

/// Visiting order of a circuit: the depot first and last, every other node
/// exactly once in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAssignment {
    nodes: Vec<usize>,
}

impl RouteAssignment {
    /// Wraps an explicit visiting order; [`Self::is_circuit`] validates it.
    pub fn from_nodes(nodes: Vec<usize>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Consecutive `(from, to)` pairs, including the return to the depot.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes.windows(2).map(|pair| (pair[0], pair[1]))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `nodes` is a closed circuit over `node_count` nodes from `depot`.
    pub fn is_circuit(&self, node_count: usize, depot: usize) -> bool {
        if self.nodes.len() != node_count + 1
            || self.nodes.first() != Some(&depot)
            || self.nodes.last() != Some(&depot)
        {
            return false;
        }
        let mut seen = vec![false; node_count];
        for &node in &self.nodes[..node_count] {
            if node >= node_count || seen[node] {
                return false;
            }
            seen[node] = true;
        }
        true
    }
}

/// A feasible circuit with its finalized cumulative bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub assignment: RouteAssignment,
    /// One bound per position of `assignment`.
    pub bounds: Vec<CumulativeBound>,
    pub cost: RouteCost,
    pub strategy: FirstSolutionStrategy,
}

struct Budget<'o> {
    started: Instant,
    limit: Option<Duration>,
    cancellation: Option<&'o CancellationToken>,
}

impl Budget<'_> {
    fn check(&self) -> Result<(), InfeasibleReason> {
        if self.cancellation.is_some_and(CancellationToken::is_cancelled) {
            return Err(InfeasibleReason::Cancelled);
        }
        if self.limit.is_some_and(|limit| self.started.elapsed() >= limit) {
            return Err(InfeasibleReason::TimedOut);
        }
        Ok(())
    }
}

/// Runs one solve over a [`RouteModel`]. Holds no state between solves.
pub struct SearchEngine<'m, 'a> {
    model: &'m RouteModel<'a>,
    options: &'m SearchOptions,
}

impl<'m, 'a> SearchEngine<'m, 'a> {
    pub fn new(model: &'m RouteModel<'a>, options: &'m SearchOptions) -> Self {
        Self { model, options }
    }

    pub fn solve(&self) -> Result<Solution, SolveError> {
        let budget = Budget {
            started: Instant::now(),
            limit: self.options.time_limit,
            cancellation: self.options.cancellation.as_ref(),
        };

        let mut constructed = None;
        for &strategy in self.options.first_solution.sequence() {
            match self.construct(strategy, &budget) {
                Ok(Some(route)) => {
                    debug!(?strategy, "first solution found");
                    constructed = Some((strategy, route));
                    break;
                }
                Ok(None) => warn!(?strategy, "construction found no feasible circuit"),
                Err(reason) => return Err(self.infeasible(reason)),
            }
        }
        let Some((strategy, route)) = constructed else {
            return Err(self.infeasible(InfeasibleReason::NoFeasibleCircuit));
        };

        let route = self.improve(route, &budget);
        let assignment = RouteAssignment { nodes: route };
        if !assignment.is_circuit(self.model.node_count(), self.model.depot()) {
            return Err(InternalInvariantError {
                stage: "construction",
                route: assignment.nodes,
                position: 0,
                bounds: Vec::new(),
            }
            .into());
        }

        let nodes = assignment.nodes();
        let cost = self.model.evaluate(nodes).ok_or_else(|| {
            self.invariant("evaluation", nodes, self.model.propagate(nodes).err())
        })?;
        let bounds = self.finalize(assignment.nodes())?;

        Ok(Solution {
            assignment,
            bounds,
            cost,
            strategy,
        })
    }

    fn construct(
        &self,
        strategy: FirstSolutionStrategy,
        budget: &Budget<'_>,
    ) -> Result<Option<Vec<usize>>, InfeasibleReason> {
        match strategy {
            FirstSolutionStrategy::PathCheapestArc => self.path_cheapest_arc(budget),
            FirstSolutionStrategy::CheapestInsertion => self.cheapest_insertion(budget),
            FirstSolutionStrategy::EarliestDeadline => {
                budget.check()?;
                let mut route = vec![self.model.depot()];
                route.extend(self.stops_by_deadline());
                route.push(self.model.depot());
                Ok(self.model.is_feasible(&route).then_some(route))
            }
            FirstSolutionStrategy::Automatic => self.path_cheapest_arc(budget),
        }
    }

    fn path_cheapest_arc(&self, budget: &Budget<'_>) -> Result<Option<Vec<usize>>, InfeasibleReason> {
        let depot = self.model.depot();
        let mut unvisited: Vec<usize> = self.stops().collect();
        let mut route = vec![depot];

        while !unvisited.is_empty() {
            budget.check()?;
            let current = route[route.len() - 1];
            unvisited.sort_by_key(|&node| (self.model.transit(current, node), node));

            let next = unvisited.iter().position(|&node| {
                route.push(node);
                let feasible = self.model.is_feasible(&route);
                route.pop();
                feasible
            });
            match next {
                Some(index) => route.push(unvisited.remove(index)),
                None => return Ok(None),
            }
        }

        route.push(depot);
        Ok(self.model.is_feasible(&route).then_some(route))
    }

    fn cheapest_insertion(&self, budget: &Budget<'_>) -> Result<Option<Vec<usize>>, InfeasibleReason> {
        let depot = self.model.depot();
        let mut route = vec![depot, depot];

        for node in self.stops_by_deadline() {
            budget.check()?;
            let mut best: Option<(RouteCost, usize)> = None;
            for position in 1..route.len() {
                route.insert(position, node);
                if let Some(cost) = self.model.evaluate(&route) {
                    if best.is_none_or(|(best_cost, _)| cost < best_cost) {
                        best = Some((cost, position));
                    }
                }
                route.remove(position);
            }
            match best {
                Some((_, position)) => route.insert(position, node),
                None => return Ok(None),
            }
        }

        Ok(Some(route))
    }

    /// Greedy descent over 2-opt and relocate moves on the span objective.
    fn improve(&self, mut route: Vec<usize>, budget: &Budget<'_>) -> Vec<usize> {
        let Some(mut cost) = self.model.evaluate(&route) else {
            return route;
        };

        for _ in 0..self.options.local_search_iterations {
            if budget.check().is_err() {
                break;
            }
            let improved = self
                .two_opt(&route, cost)
                .or_else(|| self.relocate(&route, cost));
            match improved {
                Some((candidate, candidate_cost)) => {
                    debug!(from = ?cost, to = ?candidate_cost, "accepted improving move");
                    route = candidate;
                    cost = candidate_cost;
                }
                None => break,
            }
        }

        route
    }

    fn two_opt(&self, route: &[usize], current: RouteCost) -> Option<(Vec<usize>, RouteCost)> {
        let last = route.len() - 1;
        for i in 1..last {
            for j in i + 1..last {
                let mut candidate = route.to_vec();
                candidate[i..=j].reverse();
                if let Some(cost) = self.model.evaluate(&candidate) {
                    if cost < current {
                        return Some((candidate, cost));
                    }
                }
            }
        }
        None
    }

    fn relocate(&self, route: &[usize], current: RouteCost) -> Option<(Vec<usize>, RouteCost)> {
        let last = route.len() - 1;
        for from in 1..last {
            for to in 1..last {
                if to == from {
                    continue;
                }
                let mut candidate = route.to_vec();
                let node = candidate.remove(from);
                candidate.insert(to, node);
                if let Some(cost) = self.model.evaluate(&candidate) {
                    if cost < current {
                        return Some((candidate, cost));
                    }
                }
            }
        }
        None
    }

    /// Pins the start, then the end, to their smallest feasible values.
    fn finalize(&self, route: &[usize]) -> Result<Vec<CumulativeBound>, InternalInvariantError> {
        let mut bounds = self
            .model
            .propagate(route)
            .map_err(|conflict| self.invariant("finalization", route, Some(conflict)))?;

        let last = bounds.len() - 1;
        for position in [0, last] {
            let value = bounds[position].min;
            debug!(position, value, "finalizer pin");
            self.model
                .pin(route, &mut bounds, position, value)
                .map_err(|conflict| self.invariant("finalization", route, Some(conflict)))?;
        }
        Ok(bounds)
    }

    fn stops(&self) -> impl Iterator<Item = usize> + '_ {
        let depot = self.model.depot();
        (0..self.model.node_count()).filter(move |&node| node != depot)
    }

    fn stops_by_deadline(&self) -> Vec<usize> {
        let windows = self.model.windows();
        let mut stops: Vec<usize> = self.stops().collect();
        stops.sort_by_key(|&node| (windows[node].latest, windows[node].earliest, node));
        stops
    }

    fn infeasible(&self, reason: InfeasibleReason) -> SolveError {
        warn!(%reason, "no route found");
        InfeasibleRouteError {
            reason,
            matrix: self.model.matrix().clone(),
            windows: self.model.windows().to_vec(),
        }
        .into()
    }

    fn invariant(
        &self,
        stage: &'static str,
        route: &[usize],
        conflict: Option<Conflict>,
    ) -> InternalInvariantError {
        let (position, bounds) = conflict
            .map(|conflict| (conflict.position, conflict.bounds))
            .unwrap_or_default();
        InternalInvariantError {
            stage,
            route: route.to_vec(),
            position,
            bounds,
        }
    }
}
