//! Granular local search.
//!
//! - [`Segment`] — O(1) concatenation of route timing data
//! - [`Neighbourhood`] — static granular neighbour lists
//! - [`LocalSearch`] — first-improvement search over node and route operators
//!
//! Node operators (the Exchange family and 2-opt) act on client pairs drawn
//! from the granular lists; route operators (RelocateStar, SWAP*) act on
//! pairs of routes whose circle sectors overlap, after the node operators
//! have converged.

mod exchange;
mod neighbourhood;
mod relocate_star;
mod route;
mod sector;
mod segment;
mod swap_star;
mod two_opt;

pub use neighbourhood::Neighbourhood;
pub use segment::Segment;

pub(crate) use route::SearchRoute;

use std::time::Instant;

use rand::Rng;

use crate::evaluation::PenaltyWeights;
use crate::models::{Individual, Instance};
use sector::degrees_to_angle;

/// Where a client currently sits: its route and 1-based stop index.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Position {
    pub route: usize,
    pub index: usize,
}

/// Read-only view the node operators evaluate against.
pub(crate) struct MoveContext<'a> {
    pub instance: &'a Instance,
    pub weights: PenaltyWeights,
    pub routes: &'a [SearchRoute],
    pub positions: &'a [Position],
}

/// The node operators, tried in this order for every candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeOperator {
    Exchange10,
    Exchange11,
    Exchange20,
    Exchange20Rev,
    Exchange21,
    Exchange22,
    TwoOpt,
}

const NODE_OPERATORS: [NodeOperator; 7] = [
    NodeOperator::Exchange10,
    NodeOperator::Exchange11,
    NodeOperator::Exchange20,
    NodeOperator::Exchange20Rev,
    NodeOperator::Exchange21,
    NodeOperator::Exchange22,
    NodeOperator::TwoOpt,
];

fn evaluate_operator(op: NodeOperator, ctx: &MoveContext, u: usize, v: usize) -> i64 {
    match op {
        NodeOperator::Exchange10 => exchange::evaluate_relocate(ctx, u, v),
        NodeOperator::Exchange11 => exchange::evaluate_swap(ctx, u, v),
        NodeOperator::Exchange20 => exchange::evaluate_relocate_pair(ctx, u, v, false),
        NodeOperator::Exchange20Rev => exchange::evaluate_relocate_pair(ctx, u, v, true),
        NodeOperator::Exchange21 => exchange::evaluate_swap_pair_single(ctx, u, v),
        NodeOperator::Exchange22 => exchange::evaluate_swap_pairs(ctx, u, v),
        NodeOperator::TwoOpt => two_opt::evaluate(ctx, u, v),
    }
}

fn apply_operator(
    op: NodeOperator,
    routes: &mut [SearchRoute],
    positions: &[Position],
    u: usize,
    v: usize,
) {
    match op {
        NodeOperator::Exchange10 => exchange::apply_relocate(routes, positions, u, v),
        NodeOperator::Exchange11 => exchange::apply_swap(routes, positions, u, v),
        NodeOperator::Exchange20 => exchange::apply_relocate_pair(routes, positions, u, v, false),
        NodeOperator::Exchange20Rev => exchange::apply_relocate_pair(routes, positions, u, v, true),
        NodeOperator::Exchange21 => exchange::apply_swap_pair_single(routes, positions, u, v),
        NodeOperator::Exchange22 => exchange::apply_swap_pairs(routes, positions, u, v),
        NodeOperator::TwoOpt => two_opt::apply(routes, positions, u, v),
    }
}

/// Knobs for the route-operator phase.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Whether to run route operators and post-processing at all.
    pub should_intensify: bool,
    /// Extra angular tolerance (degrees) when testing sector overlap.
    pub sector_overlap_tolerance_degrees: i64,
    /// Minimum sector width (degrees) a route is widened to before the
    /// overlap test.
    pub min_sector_size_degrees: i64,
    /// Maximum subpath length enumerated exhaustively after convergence.
    pub post_process_path_length: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            should_intensify: true,
            sector_overlap_tolerance_degrees: 0,
            min_sector_size_degrees: 15,
            post_process_path_length: 4,
        }
    }
}

/// First-improvement local search over the granular neighbourhood.
///
/// The search loads an [`Individual`], repeatedly applies the first strictly
/// improving move it finds (scanning clients in a fresh random permutation
/// each pass, and each client's granular list in stored order), runs the
/// route operators once the node operators are exhausted, and exports the
/// result as a new individual.
pub struct LocalSearch<'a> {
    instance: &'a Instance,
    neighbourhood: &'a Neighbourhood,
    params: SearchParams,
    routes: Vec<SearchRoute>,
    positions: Vec<Position>,
    order: Vec<usize>,
    deadline: Option<Instant>,
}

impl<'a> LocalSearch<'a> {
    /// Creates a search over the given instance and neighbour lists.
    pub fn new(instance: &'a Instance, neighbourhood: &'a Neighbourhood, params: SearchParams) -> Self {
        Self {
            instance,
            neighbourhood,
            params,
            routes: Vec::new(),
            positions: vec![Position::default(); instance.num_locations()],
            order: (1..instance.num_locations()).collect(),
            deadline: None,
        }
    }

    /// Sets a soft wall-clock deadline; passes already underway complete.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    fn out_of_time(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Educates an individual: searches until no operator improves it.
    pub fn search<R: Rng>(
        &mut self,
        individual: &Individual,
        weights: PenaltyWeights,
        rng: &mut R,
    ) -> Individual {
        self.load(individual);

        let mut improved = true;
        while improved && !self.out_of_time() {
            improved = self.node_phase(weights, rng);
            if self.params.should_intensify {
                improved |= self.route_phase(weights);
            }
        }
        if self.params.should_intensify && self.params.post_process_path_length >= 2 {
            self.post_process(weights);
        }

        Individual::new(
            self.instance,
            self.routes.iter().map(|r| r.clients().to_vec()).collect(),
        )
    }

    fn load(&mut self, individual: &Individual) {
        self.routes = individual
            .routes()
            .iter()
            .map(|clients| SearchRoute::new(self.instance, clients.clone()))
            .collect();
        for route_idx in 0..self.routes.len() {
            self.reindex(route_idx);
        }
    }

    fn reindex(&mut self, route_idx: usize) {
        for (i, &client) in self.routes[route_idx].clients().iter().enumerate() {
            self.positions[client] = Position {
                route: route_idx,
                index: i + 1,
            };
        }
    }

    fn apply_and_rebuild(&mut self, op: NodeOperator, u: usize, v: usize) {
        let ru = self.positions[u].route;
        let rv = self.positions[v].route;
        apply_operator(op, &mut self.routes, &self.positions, u, v);
        self.routes[ru].rebuild(self.instance);
        self.reindex(ru);
        if rv != ru {
            self.routes[rv].rebuild(self.instance);
            self.reindex(rv);
        }
    }

    /// One node-operator phase: passes over all granular pairs until a full
    /// pass yields no strictly improving move.
    fn node_phase<R: Rng>(&mut self, weights: PenaltyWeights, rng: &mut R) -> bool {
        let mut any = false;
        let mut improved = true;
        while improved && !self.out_of_time() {
            improved = false;

            // Fresh scan permutation each pass (Fisher-Yates).
            for i in (1..self.order.len()).rev() {
                let j = rng.random_range(0..=i);
                self.order.swap(i, j);
            }

            for scan in 0..self.order.len() {
                let u = self.order[scan];
                for neighbour in 0..self.neighbourhood.of(u).len() {
                    let v = self.neighbourhood.of(u)[neighbour];
                    for op in NODE_OPERATORS {
                        let delta = {
                            let ctx = MoveContext {
                                instance: self.instance,
                                weights,
                                routes: &self.routes,
                                positions: &self.positions,
                            };
                            evaluate_operator(op, &ctx, u, v)
                        };
                        if delta < 0 {
                            self.apply_and_rebuild(op, u, v);
                            improved = true;
                            any = true;
                            break;
                        }
                    }
                }
                if self.try_empty_route(weights, u) {
                    improved = true;
                    any = true;
                }
            }
        }
        any
    }

    /// Relocation of `u` (or the pair starting at `u`) into an empty route.
    ///
    /// Granular lists never point at depots, so without this a route count
    /// below the vehicle bound could never grow back.
    fn try_empty_route(&mut self, weights: PenaltyWeights, u: usize) -> bool {
        let pu = self.positions[u];
        if self.routes[pu.route].len() <= 1 {
            return false;
        }
        let Some(empty) = self.routes.iter().position(|r| r.is_empty()) else {
            return false;
        };

        let route_u = &self.routes[pu.route];
        let target = &self.routes[empty];
        let old = route_u.cost(self.instance, weights);
        let x = route_u.stop_at(pu.index + 1);

        let single = route_u.replaced_cost(self.instance, weights, pu.index, pu.index, &[])
            + target.replaced_cost(self.instance, weights, 1, 0, &[u])
            - old;
        if single < 0 {
            let client = self.routes[pu.route].clients_mut().remove(pu.index - 1);
            self.routes[empty].clients_mut().push(client);
            let from = pu.route;
            self.routes[from].rebuild(self.instance);
            self.routes[empty].rebuild(self.instance);
            self.reindex(from);
            self.reindex(empty);
            return true;
        }

        if x != 0 && route_u.len() > 2 {
            let pair = route_u.replaced_cost(self.instance, weights, pu.index, pu.index + 1, &[])
                + target.replaced_cost(self.instance, weights, 1, 0, &[u, x])
                - old;
            if pair < 0 {
                let clients = self.routes[pu.route].clients_mut();
                clients.remove(pu.index - 1);
                clients.remove(pu.index - 1);
                self.routes[empty].clients_mut().extend([u, x]);
                let from = pu.route;
                self.routes[from].rebuild(self.instance);
                self.routes[empty].rebuild(self.instance);
                self.reindex(from);
                self.reindex(empty);
                return true;
            }
        }
        false
    }

    /// One route-operator phase over all sector-overlapping route pairs.
    fn route_phase(&mut self, weights: PenaltyWeights) -> bool {
        let tolerance = degrees_to_angle(self.params.sector_overlap_tolerance_degrees);
        let min_span = degrees_to_angle(self.params.min_sector_size_degrees);
        let mut any = false;

        for r1 in 0..self.routes.len() {
            for r2 in (r1 + 1)..self.routes.len() {
                if self.routes[r1].is_empty() || self.routes[r2].is_empty() {
                    continue;
                }
                let mut s1 = *self.routes[r1].sector();
                let mut s2 = *self.routes[r2].sector();
                s1.widen_to(min_span);
                s2.widen_to(min_span);
                if !s1.overlaps(&s2, tolerance) {
                    continue;
                }

                if relocate_star::relocate_star(self.instance, weights, &mut self.routes, r1, r2) {
                    self.reindex(r1);
                    self.reindex(r2);
                    any = true;
                }
                if swap_star::swap_star(self.instance, weights, &mut self.routes, r1, r2) {
                    self.reindex(r1);
                    self.reindex(r2);
                    any = true;
                }
            }
        }
        any
    }

    /// Exhaustively re-orders short client subpaths within each route.
    fn post_process(&mut self, weights: PenaltyWeights) {
        let max_len = self.params.post_process_path_length;
        for route_idx in 0..self.routes.len() {
            let len = self.routes[route_idx].len();
            if len < 2 {
                continue;
            }
            let window = max_len.min(len);
            let mut changed = false;
            for start in 0..=(len - window) {
                let clients = self.routes[route_idx].clients().to_vec();
                let base_cost = SearchRoute::cost_of(self.instance, weights, &clients);
                let mut best = clients.clone();
                let mut best_cost = base_cost;

                let mut candidate = clients.clone();
                permute_window(&mut candidate, start, window, &mut |c| {
                    let cost = SearchRoute::cost_of(self.instance, weights, c);
                    if cost < best_cost {
                        best_cost = cost;
                        best = c.to_vec();
                    }
                });

                if best_cost < base_cost {
                    *self.routes[route_idx].clients_mut() = best;
                    self.routes[route_idx].rebuild(self.instance);
                    changed = true;
                }
            }
            if changed {
                self.reindex(route_idx);
            }
        }
    }
}

/// Calls `f` for every permutation of `seq[start..start + window]`
/// (Heap's algorithm, applied to the window in place).
fn permute_window(seq: &mut Vec<usize>, start: usize, window: usize, f: &mut impl FnMut(&[usize])) {
    fn heap(seq: &mut Vec<usize>, start: usize, k: usize, f: &mut impl FnMut(&[usize])) {
        if k <= 1 {
            f(seq);
            return;
        }
        for i in 0..k {
            heap(seq, start, k - 1, f);
            if k % 2 == 0 {
                seq.swap(start + i, start + k - 1);
            } else {
                seq.swap(start, start + k - 1);
            }
        }
    }
    heap(seq, start, window, f);
}
