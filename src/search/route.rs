//! Search-side route representation.
//!
//! Local search works on a flat, index-based view of each route: the client
//! sequence plus parallel arrays of per-stop prefix data. The arrays are
//! rebuilt in O(route length) after a move is applied, and give every move
//! evaluation the segments, loads, distances and release maxima it needs in
//! O(1).
//!
//! Stops are indexed `0..=len+1`: stop `0` is the departure depot, stops
//! `1..=len` are clients, stop `len+1` is the return depot.

use crate::evaluation::PenaltyWeights;
use crate::models::Instance;
use crate::search::sector::CircleSector;
use crate::search::Segment;

/// One route in the local-search arena.
#[derive(Debug, Clone)]
pub struct SearchRoute {
    clients: Vec<usize>,
    /// `prefix[i]`: segment of stops `0..=i` (earliest-completion data).
    prefix: Vec<Segment>,
    /// `suffix[i]`: segment of stops `i..=len+1` (latest-start data).
    suffix: Vec<Segment>,
    /// `cum_load[i]`: demand of stops `0..=i`.
    cum_load: Vec<i64>,
    /// `cum_dist[i]`: travel duration from the depot through stop `i`.
    cum_dist: Vec<i64>,
    /// `rel_prefix[i]`: maximum release time over stops `0..=i`.
    rel_prefix: Vec<i64>,
    /// `rel_suffix[i]`: maximum release time over stops `i..=len+1`.
    rel_suffix: Vec<i64>,
    sector: CircleSector,
    distance: i64,
    load: i64,
    time_warp: i64,
    release: i64,
}

impl SearchRoute {
    /// Builds a route (possibly empty) and its derived data.
    pub fn new(instance: &Instance, clients: Vec<usize>) -> Self {
        let mut route = Self {
            clients,
            prefix: Vec::new(),
            suffix: Vec::new(),
            cum_load: Vec::new(),
            cum_dist: Vec::new(),
            rel_prefix: Vec::new(),
            rel_suffix: Vec::new(),
            sector: CircleSector::new(),
            distance: 0,
            load: 0,
            time_warp: 0,
            release: 0,
        };
        route.rebuild(instance);
        route
    }

    /// Recomputes every derived quantity from the client sequence.
    pub fn rebuild(&mut self, instance: &Instance) {
        let m = self.clients.len();
        let stops = m + 2;

        self.prefix.clear();
        self.suffix.clear();
        self.cum_load.clear();
        self.cum_dist.clear();
        self.rel_prefix.clear();
        self.rel_suffix.clear();
        self.sector = CircleSector::new();

        self.prefix.reserve(stops);
        self.cum_load.reserve(stops);
        self.cum_dist.reserve(stops);
        self.rel_prefix.reserve(stops);

        let mut prefix = Segment::at(instance, 0);
        let mut load = 0;
        let mut dist = 0;
        let mut release = 0;
        self.prefix.push(prefix);
        self.cum_load.push(0);
        self.cum_dist.push(0);
        self.rel_prefix.push(0);

        let mut prev = 0;
        for i in 1..stops {
            let stop = self.stop_at(i);
            prefix = prefix.merge(Segment::at(instance, stop), instance);
            load += instance.demand(stop);
            dist += instance.duration(prev, stop);
            release = release.max(instance.release(stop));
            if stop != 0 {
                self.sector.extend(instance.angle(stop));
            }
            self.prefix.push(prefix);
            self.cum_load.push(load);
            self.cum_dist.push(dist);
            self.rel_prefix.push(release);
            prev = stop;
        }

        self.suffix = vec![Segment::at(instance, 0); stops];
        self.rel_suffix = vec![0; stops];
        let mut suffix = Segment::at(instance, 0);
        let mut rel = 0;
        self.suffix[stops - 1] = suffix;
        for i in (0..stops - 1).rev() {
            let stop = self.stop_at(i);
            suffix = Segment::at(instance, stop).merge(suffix, instance);
            rel = rel.max(instance.release(stop));
            self.suffix[i] = suffix;
            self.rel_suffix[i] = rel;
        }

        self.distance = dist;
        self.load = load;
        self.release = release;
        self.time_warp = prefix.time_warp_from(release);
    }

    /// Number of clients on the route.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if the route serves no clients.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// The client sequence.
    pub fn clients(&self) -> &[usize] {
        &self.clients
    }

    /// Mutable access for applying moves; the caller must `rebuild`.
    pub fn clients_mut(&mut self) -> &mut Vec<usize> {
        &mut self.clients
    }

    /// Location at the given stop index (depot at both ends).
    #[inline]
    pub fn stop_at(&self, index: usize) -> usize {
        if index == 0 || index == self.clients.len() + 1 {
            0
        } else {
            self.clients[index - 1]
        }
    }

    /// Total travel duration of the route.
    pub fn distance(&self) -> i64 {
        self.distance
    }

    /// Total demand served.
    pub fn load(&self) -> i64 {
        self.load
    }

    /// Time warp, including warp forced by the release time.
    pub fn time_warp(&self) -> i64 {
        self.time_warp
    }

    /// Maximum release time over the route's clients.
    pub fn release(&self) -> i64 {
        self.release
    }

    /// The route's angular sector around the depot.
    pub fn sector(&self) -> &CircleSector {
        &self.sector
    }

    /// Penalized cost of the route as it stands.
    pub fn cost(&self, instance: &Instance, weights: PenaltyWeights) -> i64 {
        weights.cost(
            self.distance,
            (self.load - instance.capacity()).max(0),
            self.time_warp,
        )
    }

    /// Penalized cost of this route with client stops `a..=b` replaced by the
    /// sequence `mid`.
    ///
    /// `a..=b` may be empty (`a == b + 1`) for a pure insertion after stop
    /// `b`, and `mid` may be empty for a pure removal. Runs in O(`mid.len()`)
    /// thanks to the per-stop prefix data.
    pub fn replaced_cost(
        &self,
        instance: &Instance,
        weights: PenaltyWeights,
        a: usize,
        b: usize,
        mid: &[usize],
    ) -> i64 {
        debug_assert!(a >= 1 && a <= b + 1 && b <= self.len());
        let before = &self.prefix[a - 1];
        let after = &self.suffix[b + 1];

        let removed_load = self.cum_load[b] - self.cum_load[a - 1];
        let mut load = self.load - removed_load;
        let mut release = self.rel_prefix[a - 1].max(self.rel_suffix[b + 1]);
        let mut dist = self.cum_dist[a - 1] + (self.distance - self.cum_dist[b + 1]);

        let segment = match Segment::of_clients(instance, mid) {
            Some(mid_segment) => {
                for &client in mid {
                    load += instance.demand(client);
                    release = release.max(instance.release(client));
                }
                dist += instance.duration(self.stop_at(a - 1), mid[0]);
                dist += mid
                    .windows(2)
                    .map(|w| instance.duration(w[0], w[1]))
                    .sum::<i64>();
                dist += instance.duration(mid[mid.len() - 1], self.stop_at(b + 1));
                before.merge(mid_segment, instance).merge(*after, instance)
            }
            None => {
                dist += instance.duration(self.stop_at(a - 1), self.stop_at(b + 1));
                before.merge(*after, instance)
            }
        };

        let time_warp = segment.time_warp_from(release);
        weights.cost(dist, (load - instance.capacity()).max(0), time_warp)
    }

    /// Penalized cost of keeping stops `0..=cut` of this route and attaching
    /// the tail of `other` after its stop `other_cut` (the 2-opt* tail swap).
    ///
    /// Runs in O(1) using both routes' prefix and suffix data.
    pub fn tail_swap_cost(
        &self,
        instance: &Instance,
        weights: PenaltyWeights,
        cut: usize,
        other: &SearchRoute,
        other_cut: usize,
    ) -> i64 {
        let segment = self.prefix[cut].merge(other.suffix[other_cut + 1], instance);
        let load = self.cum_load[cut] + (other.load - other.cum_load[other_cut]);
        let release = self.rel_prefix[cut].max(other.rel_suffix[other_cut + 1]);
        let dist = self.cum_dist[cut]
            + instance.duration(self.stop_at(cut), other.stop_at(other_cut + 1))
            + (other.distance - other.cum_dist[other_cut + 1]);

        let time_warp = segment.time_warp_from(release);
        weights.cost(dist, (load - instance.capacity()).max(0), time_warp)
    }

    /// Penalized cost of an arbitrary client sequence as a standalone route.
    ///
    /// O(sequence length); used by intra-route moves where the whole route
    /// changes shape.
    pub fn cost_of(instance: &Instance, weights: PenaltyWeights, clients: &[usize]) -> i64 {
        let metrics = crate::evaluation::route_metrics(instance, clients);
        weights.cost(
            metrics.distance,
            metrics.capacity_excess(instance.capacity()),
            metrics.time_warp,
        )
    }
}
