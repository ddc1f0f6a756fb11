//! Problem instance model.

use crate::error::SolverError;
use crate::models::Matrix;

/// Full circle in the scaled integer angle unit used for circle sectors.
pub const ANGLE_SCALE: i64 = 65_536;

/// An immutable VRPTW instance.
///
/// Locations are indexed `0..=n` with `0` the depot. All durations, demands,
/// time windows, service and release times are integers; the duration matrix
/// may be asymmetric. Instances are validated on construction and never
/// modified afterwards.
///
/// # Examples
///
/// ```
/// use hgs_vrptw::models::{Instance, Matrix};
///
/// let durations = Matrix::from_data(2, vec![0, 5, 5, 0]).unwrap();
/// let instance = Instance::new(
///     vec![(0, 0), (3, 4)],
///     vec![0, 10],
///     vec![(0, 100), (0, 80)],
///     vec![0, 10],
///     vec![0, 0],
///     30,
///     durations,
/// )
/// .unwrap();
/// assert_eq!(instance.num_clients(), 1);
/// assert_eq!(instance.duration(0, 1), 5);
/// ```
#[derive(Debug, Clone)]
pub struct Instance {
    coords: Vec<(i64, i64)>,
    demands: Vec<i64>,
    time_windows: Vec<(i64, i64)>,
    service_times: Vec<i64>,
    release_times: Vec<i64>,
    capacity: i64,
    durations: Matrix,
    num_vehicles: usize,
    angles: Vec<i64>,
}

impl Instance {
    /// Creates a validated instance.
    ///
    /// All attribute vectors must have one entry per location (depot first).
    /// Fails with [`SolverError::InvalidInstance`] on inconsistent sizes,
    /// negative durations or demands, a nonzero matrix diagonal, inverted
    /// time windows, or a depot with nonzero demand or service time.
    pub fn new(
        coords: Vec<(i64, i64)>,
        demands: Vec<i64>,
        time_windows: Vec<(i64, i64)>,
        service_times: Vec<i64>,
        release_times: Vec<i64>,
        capacity: i64,
        durations: Matrix,
    ) -> Result<Self, SolverError> {
        let n = coords.len();
        if n == 0 {
            return Err(SolverError::InvalidInstance("no locations".into()));
        }
        for (name, len) in [
            ("demands", demands.len()),
            ("time_windows", time_windows.len()),
            ("service_times", service_times.len()),
            ("release_times", release_times.len()),
            ("durations", durations.size()),
        ] {
            if len != n {
                return Err(SolverError::InvalidInstance(format!(
                    "{name} has {len} entries for {n} locations"
                )));
            }
        }
        if capacity <= 0 {
            return Err(SolverError::InvalidInstance(format!(
                "capacity {capacity} must be positive"
            )));
        }
        if demands[0] != 0 || service_times[0] != 0 {
            return Err(SolverError::InvalidInstance(
                "depot must have zero demand and service time".into(),
            ));
        }
        for i in 0..n {
            if demands[i] < 0 {
                return Err(SolverError::InvalidInstance(format!(
                    "negative demand at location {i}"
                )));
            }
            if service_times[i] < 0 || release_times[i] < 0 {
                return Err(SolverError::InvalidInstance(format!(
                    "negative service or release time at location {i}"
                )));
            }
            let (early, late) = time_windows[i];
            if early > late {
                return Err(SolverError::InvalidInstance(format!(
                    "inverted time window [{early}, {late}] at location {i}"
                )));
            }
            if durations.get(i, i) != 0 {
                return Err(SolverError::InvalidInstance(format!(
                    "nonzero duration on the diagonal at location {i}"
                )));
            }
            for j in 0..n {
                if durations.get(i, j) < 0 {
                    return Err(SolverError::InvalidInstance(format!(
                        "negative duration between {i} and {j}"
                    )));
                }
            }
        }

        let angles = polar_angles(&coords);
        let num_vehicles = vehicle_bound(&demands, capacity);
        Ok(Self {
            coords,
            demands,
            time_windows,
            service_times,
            release_times,
            capacity,
            durations,
            num_vehicles,
            angles,
        })
    }

    /// Overrides the vehicle-count upper bound.
    ///
    /// The default is a bin-packing-based heuristic; a caller with better
    /// knowledge (or a `nbVeh` config value) may replace it.
    pub fn with_num_vehicles(mut self, num_vehicles: usize) -> Self {
        self.num_vehicles = num_vehicles.max(1);
        self
    }

    /// Number of locations including the depot.
    pub fn num_locations(&self) -> usize {
        self.coords.len()
    }

    /// Number of clients (locations excluding the depot).
    pub fn num_clients(&self) -> usize {
        self.coords.len() - 1
    }

    /// Upper bound on the number of routes an individual may use.
    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    /// Vehicle capacity.
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// Coordinates of a location.
    pub fn coords(&self, location: usize) -> (i64, i64) {
        self.coords[location]
    }

    /// Demand of a location (zero for the depot).
    pub fn demand(&self, location: usize) -> i64 {
        self.demands[location]
    }

    /// Earliest allowed service start at a location.
    pub fn early(&self, location: usize) -> i64 {
        self.time_windows[location].0
    }

    /// Latest allowed service start at a location.
    pub fn late(&self, location: usize) -> i64 {
        self.time_windows[location].1
    }

    /// Service time at a location (zero for the depot).
    pub fn service(&self, location: usize) -> i64 {
        self.service_times[location]
    }

    /// Release time of a location; a route serving it cannot leave the depot
    /// earlier.
    pub fn release(&self, location: usize) -> i64 {
        self.release_times[location]
    }

    /// Travel duration from one location to another.
    #[inline]
    pub fn duration(&self, from: usize, to: usize) -> i64 {
        self.durations.get(from, to)
    }

    /// The full duration matrix.
    pub fn durations(&self) -> &Matrix {
        &self.durations
    }

    /// Polar angle of a location around the depot, scaled to `[0, 65536)`.
    pub fn angle(&self, location: usize) -> i64 {
        self.angles[location]
    }
}

/// Polar angles around the depot, in the scaled integer unit.
fn polar_angles(coords: &[(i64, i64)]) -> Vec<i64> {
    let (dx0, dy0) = coords[0];
    coords
        .iter()
        .map(|&(x, y)| {
            let angle = ((y - dy0) as f64).atan2((x - dx0) as f64);
            let scaled = (angle / (2.0 * std::f64::consts::PI) * ANGLE_SCALE as f64).round() as i64;
            scaled.rem_euclid(ANGLE_SCALE)
        })
        .collect()
}

/// Upper bound on the number of vehicles: the bin count of a first-fit
/// decreasing packing of demands into capacity-sized bins, plus a surplus of
/// `max(3, n / 10)` routes, clamped to the number of clients.
fn vehicle_bound(demands: &[i64], capacity: i64) -> usize {
    let n = demands.len() - 1;
    if n == 0 {
        return 1;
    }
    let mut sorted: Vec<i64> = demands[1..].to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let mut bins: Vec<i64> = Vec::new();
    for demand in sorted {
        match bins.iter_mut().find(|b| **b + demand <= capacity) {
            Some(bin) => *bin += demand,
            None => bins.push(demand),
        }
    }
    (bins.len() + (n / 10).max(3)).min(n.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_instance() -> Instance {
        let durations = Matrix::from_data(3, vec![0, 4, 6, 4, 0, 5, 6, 5, 0]).expect("valid");
        Instance::new(
            vec![(0, 0), (4, 0), (0, 6)],
            vec![0, 10, 20],
            vec![(0, 1000), (0, 500), (0, 500)],
            vec![0, 10, 10],
            vec![0, 0, 0],
            30,
            durations,
        )
        .expect("valid instance")
    }

    #[test]
    fn test_accessors() {
        let inst = small_instance();
        assert_eq!(inst.num_locations(), 3);
        assert_eq!(inst.num_clients(), 2);
        assert_eq!(inst.capacity(), 30);
        assert_eq!(inst.demand(1), 10);
        assert_eq!(inst.duration(1, 2), 5);
        assert_eq!(inst.duration(2, 1), 5);
        assert_eq!(inst.early(1), 0);
        assert_eq!(inst.late(1), 500);
        assert_eq!(inst.service(2), 10);
        assert_eq!(inst.release(2), 0);
    }

    #[test]
    fn test_rejects_size_mismatch() {
        let durations = Matrix::new(2);
        let result = Instance::new(
            vec![(0, 0), (1, 1)],
            vec![0],
            vec![(0, 10), (0, 10)],
            vec![0, 0],
            vec![0, 0],
            10,
            durations,
        );
        assert!(matches!(result, Err(SolverError::InvalidInstance(_))));
    }

    #[test]
    fn test_rejects_nonzero_diagonal() {
        let mut durations = Matrix::new(2);
        durations.set(1, 1, 3);
        let result = Instance::new(
            vec![(0, 0), (1, 1)],
            vec![0, 5],
            vec![(0, 10), (0, 10)],
            vec![0, 0],
            vec![0, 0],
            10,
            durations,
        );
        assert!(matches!(result, Err(SolverError::InvalidInstance(_))));
    }

    #[test]
    fn test_rejects_depot_demand() {
        let durations = Matrix::new(2);
        let result = Instance::new(
            vec![(0, 0), (1, 1)],
            vec![5, 5],
            vec![(0, 10), (0, 10)],
            vec![0, 0],
            vec![0, 0],
            10,
            durations,
        );
        assert!(matches!(result, Err(SolverError::InvalidInstance(_))));
    }

    #[test]
    fn test_rejects_inverted_window() {
        let durations = Matrix::new(2);
        let result = Instance::new(
            vec![(0, 0), (1, 1)],
            vec![0, 5],
            vec![(0, 10), (20, 10)],
            vec![0, 0],
            vec![0, 0],
            10,
            durations,
        );
        assert!(matches!(result, Err(SolverError::InvalidInstance(_))));
    }

    #[test]
    fn test_vehicle_bound() {
        // Demands 10 and 20 with capacity 30 pack into a single bin.
        let inst = small_instance();
        // 1 bin + max(3, 0) surplus, clamped to 2 clients.
        assert_eq!(inst.num_vehicles(), 2);
        let overridden = inst.with_num_vehicles(5);
        assert_eq!(overridden.num_vehicles(), 5);
    }

    #[test]
    fn test_angles_quadrants() {
        let inst = small_instance();
        // Client 1 lies due east of the depot, client 2 due north.
        assert_eq!(inst.angle(1), 0);
        assert_eq!(inst.angle(2), ANGLE_SCALE / 4);
    }
}
