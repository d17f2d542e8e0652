//! Logical simulation time: picoseconds plus a delta-cycle index.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Picoseconds per nanosecond.
pub const PS_PER_NS: u64 = 1_000;

/// A point in simulated time.
///
/// Ordered by picoseconds first, then by delta cycle. All changes within
/// one delta are visible to every reader before the next delta starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Wall-clock time in picoseconds.
    pub ps: u64,
    /// Delta cycle within the current time step.
    pub delta: u32,
}

impl SimTime {
    /// Time zero, delta zero.
    pub fn zero() -> Self {
        Self { ps: 0, delta: 0 }
    }

    /// A time step at `ps` picoseconds.
    pub fn from_ps(ps: u64) -> Self {
        Self { ps, delta: 0 }
    }

    /// The next delta cycle of the same time step.
    pub fn next_delta(&self) -> Self {
        Self {
            ps: self.ps,
            delta: self.delta + 1,
        }
    }

    /// Moves to a later time step, resetting the delta counter.
    pub fn advance_by(&self, ps: u64) -> Self {
        Self {
            ps: self.ps + ps,
            delta: 0,
        }
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ps.cmp(&other.ps).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ps != 0 && self.ps.is_multiple_of(PS_PER_NS) {
            write!(f, "{} ns", self.ps / PS_PER_NS)?;
        } else {
            write!(f, "{} ps", self.ps)?;
        }
        if self.delta > 0 {
            write!(f, " +{}d", self.delta)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_order_within_a_step() {
        let t = SimTime::from_ps(500);
        assert!(t < t.next_delta());
        assert!(t.next_delta().next_delta() < SimTime::from_ps(501));
    }

    #[test]
    fn advancing_resets_delta() {
        let t = SimTime::zero().next_delta().advance_by(10_000);
        assert_eq!(t, SimTime { ps: 10_000, delta: 0 });
    }

    #[test]
    fn display() {
        assert_eq!(SimTime::zero().to_string(), "0 ps");
        assert_eq!(SimTime::from_ps(10_000).to_string(), "10 ns");
        assert_eq!(SimTime::from_ps(1_500).next_delta().to_string(), "1500 ps +1d");
    }

    #[test]
    fn serde_roundtrip() {
        let t = SimTime { ps: 42, delta: 3 };
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(serde_json::from_str::<SimTime>(&json).unwrap(), t);
    }
}
