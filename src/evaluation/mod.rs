//! Cost evaluation and penalty management.
//!
//! - [`PenaltyManager`] — adaptive integer weights on capacity excess and time warp
//! - [`route_metrics()`] — exact distance / load / time-warp of a route
//! - [`verify_individual()`] — recompute-from-scratch check of cached costs

mod penalty;

pub use penalty::{PenaltyManager, PenaltyParams, PenaltyWeights};

use crate::error::SolverError;
use crate::models::{Individual, Instance};
use crate::search::Segment;

/// Exact cost components of one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteMetrics {
    /// Sum of travel durations along the route, including both depot arcs.
    pub distance: i64,
    /// Sum of client demands.
    pub load: i64,
    /// Total time warp, including warp forced by the route's release time.
    pub time_warp: i64,
}

impl RouteMetrics {
    /// Load above vehicle capacity, zero when feasible.
    pub fn capacity_excess(&self, capacity: i64) -> i64 {
        (self.load - capacity).max(0)
    }
}

/// Computes the exact metrics of a route given as a client sequence.
///
/// An empty route has all-zero metrics. The route's release time is the
/// maximum release time over its clients; departure before it is impossible,
/// so any lateness it forces is counted as time warp.
pub fn route_metrics(instance: &Instance, clients: &[usize]) -> RouteMetrics {
    if clients.is_empty() {
        return RouteMetrics::default();
    }
    let mut distance = 0;
    let mut load = 0;
    let mut release = 0;
    let mut prev = 0;
    for &client in clients {
        distance += instance.duration(prev, client);
        load += instance.demand(client);
        release = release.max(instance.release(client));
        prev = client;
    }
    distance += instance.duration(prev, 0);

    let segment = Segment::of_route(instance, clients);
    RouteMetrics {
        distance,
        load,
        time_warp: segment.time_warp_from(release),
    }
}

/// Brute-force time warp: greedily advance time along the route, warping
/// back at every stop whose latest service start has passed.
///
/// Used as the oracle the segment computation must agree with.
pub fn route_time_warp_greedy(instance: &Instance, clients: &[usize]) -> i64 {
    if clients.is_empty() {
        return 0;
    }
    let release = clients
        .iter()
        .map(|&c| instance.release(c))
        .max()
        .unwrap_or(0);

    let mut time = instance.early(0).max(release);
    let mut warp = 0;
    if time > instance.late(0) {
        warp += time - instance.late(0);
        time = instance.late(0);
    }
    let mut prev = 0;
    for &client in clients {
        time += instance.duration(prev, client);
        if time > instance.late(client) {
            warp += time - instance.late(client);
            time = instance.late(client);
        }
        time = time.max(instance.early(client)) + instance.service(client);
        prev = client;
    }
    time += instance.duration(prev, 0);
    if time > instance.late(0) {
        warp += time - instance.late(0);
    }
    warp
}

/// Recomputes an individual's cost components from scratch and compares them
/// with the cached values.
///
/// A mismatch means an incremental update went wrong somewhere and is fatal.
pub fn verify_individual(instance: &Instance, individual: &Individual) -> Result<(), SolverError> {
    let mut distance = 0;
    let mut excess = 0;
    let mut time_warp = 0;
    for route in individual.routes() {
        let metrics = route_metrics(instance, route);
        distance += metrics.distance;
        excess += metrics.capacity_excess(instance.capacity());
        time_warp += metrics.time_warp;
    }
    if distance != individual.distance()
        || excess != individual.capacity_excess()
        || time_warp != individual.time_warp()
    {
        return Err(SolverError::ValidationError(format!(
            "cached cost ({}, {}, {}) differs from recomputation ({}, {}, {})",
            individual.distance(),
            individual.capacity_excess(),
            individual.time_warp(),
            distance,
            excess,
            time_warp
        )));
    }
    Ok(())
}
