//! Time-window segments.
//!
//! # Algorithm
//!
//! A segment summarizes the timing of a contiguous stop sequence by four
//! integers: total duration (travel, service and unavoidable waiting),
//! accumulated time warp, and the earliest/latest start times that realize
//! that minimum warp. Two adjacent segments merge in O(1), which is what
//! makes constant-time move evaluation possible: every candidate route is a
//! concatenation of a few precomputed segments.
//!
//! # Reference
//!
//! Vidal, T. et al. (2013). "A hybrid genetic algorithm with adaptive
//! diversity management for a large class of vehicle routing problems with
//! time-windows", *Computers & Operations Research* 40(1), 475-489.

use crate::models::Instance;

/// Timing summary of a contiguous sequence of stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    first: usize,
    last: usize,
    duration: i64,
    time_warp: i64,
    tw_early: i64,
    tw_late: i64,
}

impl Segment {
    /// The singleton segment of one stop (client or depot).
    pub fn at(instance: &Instance, location: usize) -> Self {
        Self {
            first: location,
            last: location,
            duration: instance.service(location),
            time_warp: 0,
            tw_early: instance.early(location),
            tw_late: instance.late(location),
        }
    }

    /// Concatenates `self` with a segment that follows it on the route.
    pub fn merge(self, after: Segment, instance: &Instance) -> Self {
        let travel = instance.duration(self.last, after.first);
        let delta = self.duration - self.time_warp + travel;
        let delta_wait = (after.tw_early - delta - self.tw_late).max(0);
        let delta_tw = (self.tw_early + delta - after.tw_late).max(0);
        Self {
            first: self.first,
            last: after.last,
            duration: self.duration + after.duration + travel + delta_wait,
            time_warp: self.time_warp + after.time_warp + delta_tw,
            tw_early: (after.tw_early - delta).max(self.tw_early) - delta_wait,
            tw_late: (after.tw_late - delta).min(self.tw_late) + delta_tw,
        }
    }

    /// The segment of a whole route: depot, the given clients, depot.
    pub fn of_route(instance: &Instance, clients: &[usize]) -> Self {
        let mut segment = Self::at(instance, 0);
        for &client in clients {
            segment = segment.merge(Self::at(instance, client), instance);
        }
        segment.merge(Self::at(instance, 0), instance)
    }

    /// The segment of a client sequence in the given order (no depots).
    pub fn of_clients(instance: &Instance, clients: &[usize]) -> Option<Self> {
        let (&head, tail) = clients.split_first()?;
        let mut segment = Self::at(instance, head);
        for &client in tail {
            segment = segment.merge(Self::at(instance, client), instance);
        }
        Some(segment)
    }

    /// Time warp of this segment when its start can be chosen freely.
    pub fn time_warp(&self) -> i64 {
        self.time_warp
    }

    /// Time warp when the start is additionally constrained to be no earlier
    /// than `release`: starting after the latest warp-free start adds warp
    /// one-for-one.
    pub fn time_warp_from(&self, release: i64) -> i64 {
        self.time_warp + (release - self.tw_late).max(0)
    }

    /// Total duration including service and unavoidable waiting.
    pub fn duration(&self) -> i64 {
        self.duration
    }

    /// Earliest start realizing the minimum time warp.
    pub fn tw_early(&self) -> i64 {
        self.tw_early
    }

    /// Latest start realizing the minimum time warp.
    pub fn tw_late(&self) -> i64 {
        self.tw_late
    }

    /// First stop of the segment.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Last stop of the segment.
    pub fn last(&self) -> usize {
        self.last
    }
}
