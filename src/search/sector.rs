//! Circle sectors for route-pair pruning.

use crate::models::ANGLE_SCALE;

fn positive_mod(value: i64) -> i64 {
    value.rem_euclid(ANGLE_SCALE)
}

/// The angular span of a route's clients around the depot.
///
/// Angles use the scaled integer unit of [`crate::models::Instance::angle`]:
/// a full circle is `65536`. Route operators only consider pairs of routes
/// whose sectors overlap, which prunes most pairs on clustered instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircleSector {
    start: i64,
    end: i64,
    empty: bool,
}

impl CircleSector {
    /// An empty sector containing no angle.
    pub fn new() -> Self {
        Self {
            start: 0,
            end: 0,
            empty: true,
        }
    }

    /// Returns `true` if no angle has been added yet.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Angular width of the sector.
    pub fn span(&self) -> i64 {
        if self.empty {
            0
        } else {
            positive_mod(self.end - self.start)
        }
    }

    /// Returns `true` if the angle lies within the sector.
    pub fn encloses(&self, angle: i64) -> bool {
        !self.empty && positive_mod(angle - self.start) <= positive_mod(self.end - self.start)
    }

    /// Grows the sector to include the angle, choosing the smaller extension.
    pub fn extend(&mut self, angle: i64) {
        if self.empty {
            self.start = positive_mod(angle);
            self.end = self.start;
            self.empty = false;
        } else if !self.encloses(angle) {
            if positive_mod(angle - self.end) <= positive_mod(self.start - angle) {
                self.end = positive_mod(angle);
            } else {
                self.start = positive_mod(angle);
            }
        }
    }

    /// Grows the sector symmetrically until its span reaches `min_span`.
    pub fn widen_to(&mut self, min_span: i64) {
        if self.empty {
            return;
        }
        let grow = (min_span - self.span() + 1) / 2;
        if grow > 0 {
            self.start = positive_mod(self.start - grow);
            self.end = positive_mod(self.end + grow);
        }
    }

    /// Returns `true` if the two sectors overlap, allowing the given angular
    /// tolerance on both sides.
    pub fn overlaps(&self, other: &CircleSector, tolerance: i64) -> bool {
        if self.empty || other.empty {
            return false;
        }
        positive_mod(other.start - self.start) <= positive_mod(self.end - self.start) + tolerance
            || positive_mod(self.start - other.start)
                <= positive_mod(other.end - other.start) + tolerance
    }
}

impl Default for CircleSector {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a tolerance or minimum size in degrees to the scaled angle unit.
pub fn degrees_to_angle(degrees: i64) -> i64 {
    degrees * ANGLE_SCALE / 360
}
