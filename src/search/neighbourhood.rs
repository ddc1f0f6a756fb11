//! Granular neighbour lists.
//!
//! # Algorithm
//!
//! For each client the list holds the `nbGranular` most promising partners
//! according to a proximity proxy that combines travel duration with
//! estimated waiting and time-warp when serving the partner directly after
//! the client. Restricting local-search moves to these lists keeps each pass
//! near-linear in the number of clients.
//!
//! # Reference
//!
//! Toth, P., Vigo, D. (2003). "The granular tabu search and its application
//! to the vehicle-routing problem", *INFORMS Journal on Computing* 15(4).

use crate::models::Instance;

/// Static per-client lists of promising move partners.
///
/// Lists are computed once per instance and never change. They are
/// bidirectional: a partner appears if it is among the nearest by the proxy
/// in either direction, which matters for asymmetric duration matrices.
///
/// # Examples
///
/// ```
/// use hgs_vrptw::models::{Instance, Matrix};
/// use hgs_vrptw::search::Neighbourhood;
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
/// let neighbourhood = Neighbourhood::new(&instance, 5, 2, 10);
/// assert_eq!(neighbourhood.of(1), &[2]);
/// ```
#[derive(Debug, Clone)]
pub struct Neighbourhood {
    lists: Vec<Vec<usize>>,
}

impl Neighbourhood {
    /// Computes the neighbour lists.
    ///
    /// `weight_wait` and `weight_time_warp` weigh the estimated waiting time
    /// and time warp of serving the partner right after the client.
    pub fn new(
        instance: &Instance,
        nb_granular: usize,
        weight_wait: i64,
        weight_time_warp: i64,
    ) -> Self {
        let n = instance.num_clients();
        let proxy = |from: usize, to: usize| -> i64 {
            let duration = instance.duration(from, to);
            let wait = (instance.early(to) - instance.service(from) - duration).max(0);
            let warp =
                (instance.early(from) + instance.service(from) + duration - instance.late(to))
                    .max(0);
            duration + weight_wait * wait + weight_time_warp * warp
        };

        let mut lists = vec![Vec::new(); n + 1];
        for client in 1..=n {
            let mut candidates: Vec<(i64, usize)> = (1..=n)
                .filter(|&other| other != client)
                .map(|other| (proxy(client, other), other))
                .collect();
            candidates.sort_unstable();

            let mut kept: Vec<usize> =
                candidates.iter().take(nb_granular).map(|&(_, c)| c).collect();

            // Union with the partners that rank this client among their
            // nearest, so asymmetric promising arcs are kept both ways.
            if !instance.durations().is_symmetric() {
                let mut inbound: Vec<(i64, usize)> = (1..=n)
                    .filter(|&other| other != client)
                    .map(|other| (proxy(other, client), other))
                    .collect();
                inbound.sort_unstable();
                for &(_, other) in inbound.iter().take(nb_granular) {
                    if !kept.contains(&other) {
                        kept.push(other);
                    }
                }
                kept.sort_by_key(|&other| (proxy(client, other), other));
                kept.truncate(nb_granular);
            }

            lists[client] = kept;
        }
        Self { lists }
    }

    /// The neighbour list of a client, in proximity order.
    pub fn of(&self, client: usize) -> &[usize] {
        &self.lists[client]
    }
}
