//! SWAP* route operator.
//!
//! # Algorithm
//!
//! SWAP* exchanges one client from each of two routes, but unlike a plain
//! swap each client may enter the other route at its own best position.
//! Trying every (client, client, position, position) combination is cubic,
//! so candidate positions are pruned with the three-best-insertion trick:
//! for every client the three cheapest insertion points (by distance) into
//! the other route are precomputed, which is enough because at most two of
//! them can be invalidated by the removal of the swap partner. The best
//! candidate pair by the distance-and-load proxy is then evaluated exactly
//! (including time warp) before being applied.
//!
//! # Reference
//!
//! Vidal, T. (2022). "Hybrid genetic search for the CVRP: Open-source
//! implementation and SWAP* neighborhood", *Computers & Operations Research*
//! 140.

use crate::evaluation::PenaltyWeights;
use crate::models::Instance;

use super::route::SearchRoute;

/// One candidate insertion point: after which stop, at what distance delta.
#[derive(Debug, Clone, Copy)]
struct InsertPoint {
    cost: i64,
    /// Client preceding the insertion point, 0 for the front of the route.
    after: usize,
}

/// The three cheapest insertion points of a client into a route.
#[derive(Debug, Clone, Copy)]
struct ThreeBest {
    points: [Option<InsertPoint>; 3],
}

impl ThreeBest {
    fn new() -> Self {
        Self { points: [None; 3] }
    }

    fn add(&mut self, candidate: InsertPoint) {
        for slot in 0..3 {
            match self.points[slot] {
                Some(existing) if candidate.cost >= existing.cost => continue,
                _ => {
                    for shift in (slot + 1..3).rev() {
                        self.points[shift] = self.points[shift - 1];
                    }
                    self.points[slot] = Some(candidate);
                    return;
                }
            }
        }
    }
}

/// Distance delta of inserting `client` after every stop of `route`.
fn three_best_inserts(instance: &Instance, route: &SearchRoute, client: usize) -> ThreeBest {
    let mut best = ThreeBest::new();
    for position in 0..=route.len() {
        let before = route.stop_at(position);
        let next = route.stop_at(position + 1);
        let cost = instance.duration(before, client) + instance.duration(client, next)
            - instance.duration(before, next);
        best.add(InsertPoint {
            cost,
            after: before,
        });
    }
    best
}

/// Distance delta of removing the stop at `index` from `route`.
fn removal_delta(instance: &Instance, route: &SearchRoute, index: usize) -> i64 {
    let prev = route.stop_at(index - 1);
    let client = route.stop_at(index);
    let next = route.stop_at(index + 1);
    instance.duration(prev, next)
        - instance.duration(prev, client)
        - instance.duration(client, next)
}

/// Cheapest insertion of `client` into `route` while `removed` (a client of
/// that route) is simultaneously taken out.
fn cheapest_insert_without(
    instance: &Instance,
    route: &SearchRoute,
    bests: &ThreeBest,
    client: usize,
    removed: usize,
    removed_index: usize,
) -> InsertPoint {
    // In place of the removed client is always available.
    let prev = route.stop_at(removed_index - 1);
    let next = route.stop_at(removed_index + 1);
    let in_place = InsertPoint {
        cost: instance.duration(prev, client) + instance.duration(client, next)
            - instance.duration(prev, next),
        after: prev,
    };

    let mut best = in_place;
    for point in bests.points.iter().flatten() {
        // A precomputed point is stale if it sits directly before or after
        // the removed client.
        if point.after == removed || point.after == prev {
            continue;
        }
        if point.cost < best.cost {
            best = *point;
        }
    }
    best
}

fn insert_after(sequence: &mut Vec<usize>, client: usize, after: usize) {
    if after == 0 {
        sequence.insert(0, client);
    } else {
        let position = sequence
            .iter()
            .position(|&c| c == after)
            .expect("insertion anchor must be on the route");
        sequence.insert(position + 1, client);
    }
}

/// Tries the best SWAP* move between the two routes; applies and returns
/// `true` if it strictly improves the penalized cost.
pub(crate) fn swap_star(
    instance: &Instance,
    weights: PenaltyWeights,
    routes: &mut [SearchRoute],
    r1: usize,
    r2: usize,
) -> bool {
    let (route1, route2) = (&routes[r1], &routes[r2]);
    if route1.is_empty() || route2.is_empty() {
        return false;
    }
    let capacity = instance.capacity();
    let excess = |load: i64| (load - capacity).max(0);

    let from1: Vec<(usize, usize, i64, ThreeBest)> = (1..=route1.len())
        .map(|idx| {
            let client = route1.stop_at(idx);
            (
                idx,
                client,
                removal_delta(instance, route1, idx),
                three_best_inserts(instance, route2, client),
            )
        })
        .collect();
    let from2: Vec<(usize, usize, i64, ThreeBest)> = (1..=route2.len())
        .map(|idx| {
            let client = route2.stop_at(idx);
            (
                idx,
                client,
                removal_delta(instance, route2, idx),
                three_best_inserts(instance, route1, client),
            )
        })
        .collect();

    let mut best: Option<(i64, usize, usize, usize, usize)> = None;
    for &(iu, u, removal_u, ref bests_u) in &from1 {
        for &(iv, v, removal_v, ref bests_v) in &from2 {
            let insert_u = cheapest_insert_without(instance, route2, bests_u, u, v, iv);
            let insert_v = cheapest_insert_without(instance, route1, bests_v, v, u, iu);

            let load1 = route1.load() - instance.demand(u) + instance.demand(v);
            let load2 = route2.load() - instance.demand(v) + instance.demand(u);
            let load_penalty = weights.capacity
                * (excess(load1) + excess(load2) - excess(route1.load()) - excess(route2.load()));

            let proxy =
                removal_u + removal_v + insert_u.cost + insert_v.cost + load_penalty;
            if best.map_or(proxy < 0, |(b, ..)| proxy < b) {
                best = Some((proxy, u, v, insert_u.after, insert_v.after));
            }
        }
    }

    let Some((_, u, v, after_u, after_v)) = best else {
        return false;
    };

    // The proxy ignores time warp; evaluate the chosen pair exactly before
    // committing.
    let mut new1: Vec<usize> = route1.clients().iter().copied().filter(|&c| c != u).collect();
    insert_after(&mut new1, v, after_v);
    let mut new2: Vec<usize> = route2.clients().iter().copied().filter(|&c| c != v).collect();
    insert_after(&mut new2, u, after_u);

    let exact = SearchRoute::cost_of(instance, weights, &new1)
        + SearchRoute::cost_of(instance, weights, &new2)
        - route1.cost(instance, weights)
        - route2.cost(instance, weights);
    if exact >= 0 {
        return false;
    }

    *routes[r1].clients_mut() = new1;
    *routes[r2].clients_mut() = new2;
    routes[r1].rebuild(instance);
    routes[r2].rebuild(instance);
    true
}
