//! Candidate solutions.

use std::cmp::Ordering;

use rand::Rng;

use crate::evaluation::{route_metrics, PenaltyWeights};
use crate::models::Instance;

/// One candidate solution: a set of routes over all clients.
///
/// Construction normalizes the route list (empty routes dropped, non-empty
/// routes ordered by their first client, padded back to the vehicle bound)
/// and computes cached cost components. Individuals are immutable; local
/// search produces a new individual rather than mutating one in place.
///
/// # Examples
///
/// ```
/// use hgs_vrptw::models::{Individual, Instance, Matrix};
///
/// let durations = Matrix::from_data(3, vec![0, 4, 6, 4, 0, 5, 6, 5, 0]).unwrap();
/// let instance = Instance::new(
///     vec![(0, 0), (4, 0), (0, 6)],
///     vec![0, 10, 20],
///     vec![(0, 1000), (0, 500), (0, 500)],
///     vec![0, 10, 10],
///     vec![0, 0, 0],
///     30,
///     durations,
/// )
/// .unwrap();
///
/// let individual = Individual::new(&instance, vec![vec![1], vec![2]]);
/// assert_eq!(individual.distance(), 8 + 12);
/// assert!(individual.is_feasible());
/// ```
#[derive(Debug, Clone)]
pub struct Individual {
    routes: Vec<Vec<usize>>,
    client_route: Vec<usize>,
    successors: Vec<usize>,
    predecessors: Vec<usize>,
    distance: i64,
    capacity_excess: i64,
    time_warp: i64,
}

impl Individual {
    /// Builds an individual from an explicit route list.
    ///
    /// Clients absent from `routes` are simply not served; complete route
    /// lists are the caller's responsibility (crossover repair guarantees
    /// them).
    pub fn new(instance: &Instance, routes: Vec<Vec<usize>>) -> Self {
        let mut nonempty: Vec<Vec<usize>> = routes.into_iter().filter(|r| !r.is_empty()).collect();
        nonempty.sort_by_key(|r| r[0]);

        let num_routes = instance.num_vehicles().max(nonempty.len());
        let mut padded = nonempty;
        padded.resize(num_routes, Vec::new());

        let n = instance.num_locations();
        let mut client_route = vec![usize::MAX; n];
        let mut successors = vec![0; n];
        let mut predecessors = vec![0; n];
        let mut distance = 0;
        let mut capacity_excess = 0;
        let mut time_warp = 0;

        for (route_idx, route) in padded.iter().enumerate() {
            let mut prev = 0;
            for &client in route {
                client_route[client] = route_idx;
                predecessors[client] = prev;
                if prev != 0 {
                    successors[prev] = client;
                }
                prev = client;
            }
            if prev != 0 {
                successors[prev] = 0;
            }

            let metrics = route_metrics(instance, route);
            distance += metrics.distance;
            capacity_excess += metrics.capacity_excess(instance.capacity());
            time_warp += metrics.time_warp;
        }

        Self {
            routes: padded,
            client_route,
            successors,
            predecessors,
            distance,
            capacity_excess,
            time_warp,
        }
    }

    /// Builds a random individual: a shuffled client permutation distributed
    /// over the available routes, filling each route up to capacity.
    pub fn random<R: Rng>(instance: &Instance, rng: &mut R) -> Self {
        let n = instance.num_clients();
        let mut perm: Vec<usize> = (1..=n).collect();

        // Fisher-Yates shuffle
        for i in (1..perm.len()).rev() {
            let j = rng.random_range(0..=i);
            perm.swap(i, j);
        }

        let num_routes = instance.num_vehicles();
        let mut routes: Vec<Vec<usize>> = vec![Vec::new(); num_routes];
        let mut route_idx = 0;
        let mut load = 0;
        for client in perm {
            let demand = instance.demand(client);
            if load + demand > instance.capacity() && route_idx + 1 < num_routes {
                route_idx += 1;
                load = 0;
            }
            routes[route_idx].push(client);
            load += demand;
        }
        Self::new(instance, routes)
    }

    /// Penalized cost under the given weights.
    pub fn cost(&self, weights: PenaltyWeights) -> i64 {
        weights.cost(self.distance, self.capacity_excess, self.time_warp)
    }

    /// Raw travel distance, ignoring penalties.
    pub fn distance(&self) -> i64 {
        self.distance
    }

    /// Total load above capacity, summed over routes.
    pub fn capacity_excess(&self) -> i64 {
        self.capacity_excess
    }

    /// Total time warp, summed over routes.
    pub fn time_warp(&self) -> i64 {
        self.time_warp
    }

    /// A solution is feasible when no route exceeds capacity or warps time.
    pub fn is_feasible(&self) -> bool {
        self.capacity_excess == 0 && self.time_warp == 0
    }

    /// Feasibility with respect to capacity alone.
    pub fn is_capacity_feasible(&self) -> bool {
        self.capacity_excess == 0
    }

    /// Feasibility with respect to time windows alone.
    pub fn is_time_warp_feasible(&self) -> bool {
        self.time_warp == 0
    }

    /// All routes, including empty ones, in stable order.
    pub fn routes(&self) -> &[Vec<usize>] {
        &self.routes
    }

    /// The non-empty routes in stable order.
    pub fn nonempty_routes(&self) -> impl Iterator<Item = &Vec<usize>> {
        self.routes.iter().filter(|r| !r.is_empty())
    }

    /// Number of routes actually used.
    pub fn num_nonempty_routes(&self) -> usize {
        self.routes.iter().filter(|r| !r.is_empty()).count()
    }

    /// Index of the route serving a client, if it is served.
    pub fn route_of(&self, client: usize) -> Option<usize> {
        let idx = self.client_route[client];
        (idx != usize::MAX).then_some(idx)
    }

    /// The client served after this one on its route (0 for the last).
    pub fn successor(&self, client: usize) -> usize {
        self.successors[client]
    }

    /// The client served before this one on its route (0 for the first).
    pub fn predecessor(&self, client: usize) -> usize {
        self.predecessors[client]
    }

    /// Concatenation of the non-empty routes in stable order.
    pub fn giant_tour(&self) -> Vec<usize> {
        self.routes.iter().flatten().copied().collect()
    }

    /// Broken-pairs distance: the number of clients whose successor differs
    /// between the two individuals.
    pub fn broken_pairs_distance(&self, other: &Individual) -> i64 {
        (1..self.successors.len())
            .filter(|&c| self.successors[c] != other.successors[c])
            .count() as i64
    }

    /// Orders by penalized cost, ties broken by raw distance.
    pub fn compare(&self, other: &Individual, weights: PenaltyWeights) -> Ordering {
        self.cost(weights)
            .cmp(&other.cost(weights))
            .then(self.distance.cmp(&other.distance))
    }
}
