//! 2-opt node operator.
//!
//! Within a route, reverses the client segment between `u` and `v`. Between
//! routes it becomes 2-opt*: the routes exchange their tails after `u` and
//! `v`. The tail exchange evaluates in O(1) from both routes' prefix and
//! suffix data; the intra-route reversal costs one pass because reversal
//! changes every internal arc on an asymmetric matrix.

use super::route::SearchRoute;
use super::MoveContext;

/// Signed change in penalized cost of the 2-opt move for `(u, v)`.
pub(crate) fn evaluate(ctx: &MoveContext, u: usize, v: usize) -> i64 {
    let pu = ctx.positions[u];
    let pv = ctx.positions[v];
    if pu.route == pv.route {
        if pv.index <= pu.index + 1 {
            return 0;
        }
        let route = &ctx.routes[pu.route];
        let mut candidate = route.clients().to_vec();
        candidate[pu.index..pv.index].reverse();
        return SearchRoute::cost_of(ctx.instance, ctx.weights, &candidate)
            - route.cost(ctx.instance, ctx.weights);
    }

    let route_u = &ctx.routes[pu.route];
    let route_v = &ctx.routes[pv.route];
    let new_u = route_u.tail_swap_cost(ctx.instance, ctx.weights, pu.index, route_v, pv.index);
    let new_v = route_v.tail_swap_cost(ctx.instance, ctx.weights, pv.index, route_u, pu.index);
    new_u + new_v
        - route_u.cost(ctx.instance, ctx.weights)
        - route_v.cost(ctx.instance, ctx.weights)
}

pub(crate) fn apply(routes: &mut [SearchRoute], positions: &[super::Position], u: usize, v: usize) {
    let pu = positions[u];
    let pv = positions[v];
    if pu.route == pv.route {
        routes[pu.route].clients_mut()[pu.index..pv.index].reverse();
    } else {
        let tail_u: Vec<usize> = routes[pu.route].clients()[pu.index..].to_vec();
        let tail_v: Vec<usize> = routes[pv.route].clients()[pv.index..].to_vec();
        let clients_u = routes[pu.route].clients_mut();
        clients_u.truncate(pu.index);
        clients_u.extend(tail_v);
        let clients_v = routes[pv.route].clients_mut();
        clients_v.truncate(pv.index);
        clients_v.extend(tail_u);
    }
}

#[cfg(test)]
mod tests {
    use super::super::{MoveContext, Position};
    use super::*;
    use crate::evaluation::PenaltyWeights;
    use crate::models::{Instance, Matrix};

    fn instance() -> Instance {
        let durations = Matrix::from_data(
            5,
            vec![
                0, 10, 11, 12, 13, //
                10, 0, 1, 2, 3, //
                11, 1, 0, 1, 2, //
                12, 2, 1, 0, 1, //
                13, 3, 2, 1, 0,
            ],
        )
        .expect("valid");
        Instance::new(
            vec![(0, 0), (10, 0), (11, 0), (12, 0), (13, 0)],
            vec![0, 1, 1, 1, 1],
            vec![(0, 1000); 5],
            vec![0; 5],
            vec![0; 5],
            100,
            durations,
        )
        .expect("valid instance")
    }

    fn context_positions(routes: &[SearchRoute], n: usize) -> Vec<Position> {
        let mut positions = vec![Position { route: 0, index: 0 }; n + 1];
        for (r, route) in routes.iter().enumerate() {
            for (i, &c) in route.clients().iter().enumerate() {
                positions[c] = Position {
                    route: r,
                    index: i + 1,
                };
            }
        }
        positions
    }

    #[test]
    fn test_intra_route_reversal_delta() {
        let inst = instance();
        let w = PenaltyWeights {
            capacity: 1,
            time_warp: 1,
        };
        // Route [1, 3, 2, 4] untangles to [1, 2, 3, 4] by reversing between
        // stops 1 and 3.
        let routes = vec![SearchRoute::new(&inst, vec![1, 3, 2, 4])];
        let positions = context_positions(&routes, 4);
        let ctx = MoveContext {
            instance: &inst,
            weights: w,
            routes: &routes,
            positions: &positions,
        };
        let delta = evaluate(&ctx, 1, 2);
        let untangled = SearchRoute::cost_of(&inst, w, &[1, 2, 3, 4]);
        let tangled = SearchRoute::cost_of(&inst, w, &[1, 3, 2, 4]);
        assert_eq!(delta, untangled - tangled);
        assert!(delta < 0);

        let mut routes = routes;
        apply(&mut routes, &positions, 1, 2);
        assert_eq!(routes[0].clients(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_tail_swap_delta() {
        let inst = instance();
        let w = PenaltyWeights {
            capacity: 1,
            time_warp: 1,
        };
        let routes = vec![
            SearchRoute::new(&inst, vec![1, 4]),
            SearchRoute::new(&inst, vec![3, 2]),
        ];
        let positions = context_positions(&routes, 4);
        let ctx = MoveContext {
            instance: &inst,
            weights: w,
            routes: &routes,
            positions: &positions,
        };
        // Swapping tails after 1 and 3 yields [1, 2] and [3, 4].
        let delta = evaluate(&ctx, 1, 3);
        let expected = SearchRoute::cost_of(&inst, w, &[1, 2])
            + SearchRoute::cost_of(&inst, w, &[3, 4])
            - SearchRoute::cost_of(&inst, w, &[1, 4])
            - SearchRoute::cost_of(&inst, w, &[3, 2]);
        assert_eq!(delta, expected);

        let mut routes = routes;
        apply(&mut routes, &positions, 1, 3);
        assert_eq!(routes[0].clients(), &[1, 2]);
        assert_eq!(routes[1].clients(), &[3, 4]);
    }
}
