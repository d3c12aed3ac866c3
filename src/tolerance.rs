//! Mass tolerance windows.
//!
//! Distinct from a `rustyms`-style [`Tolerance`](https://docs.rs/rustyms) (ppm *or* absolute,
//! picked per search) this crate's tolerance is always the wider of the two: a ppm term that
//! scales with the reference mass plus a constant floor that keeps low-mass references from
//! collapsing to a near-zero window. The resulting window is symmetric and closed at its
//! boundary.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::system::{ppm, Mass, Ratio};

/// `max(absolute, ppm * reference)`, applied symmetrically around a reference mass.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Deviation {
    ppm: f64,
    absolute: Mass,
}

impl Deviation {
    /// A deviation combining a ppm term and an absolute floor.
    pub fn new(ppm_value: f64, absolute: Mass) -> Self {
        Self { ppm: ppm_value, absolute }
    }

    /// A deviation with only a ppm term (absolute floor of zero).
    pub fn from_ppm(ppm_value: f64) -> Self {
        Self::new(ppm_value, Mass::new::<crate::system::dalton>(0.0))
    }

    /// The half-width of the tolerance window around `reference`.
    pub fn allowed_deviation(self, reference: Mass) -> Mass {
        let ppm_term = reference.abs() * Ratio::new::<ppm>(self.ppm);
        ppm_term.max(self.absolute)
    }

    /// `true` iff `measured` lies within the closed window `[reference - d, reference + d]`,
    /// where `d = allowed_deviation(reference)`.
    pub fn contains(self, measured: Mass, reference: Mass) -> bool {
        (measured - reference).abs() <= self.allowed_deviation(reference)
    }

    /// The `(lower, upper)` bounds of the window around `reference`.
    pub fn bounds(self, reference: Mass) -> (Mass, Mass) {
        let d = self.allowed_deviation(reference);
        (reference - d, reference + d)
    }
}

impl Display for Deviation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ppm / {:.6} Da abs", self.ppm, self.absolute.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::da;

    #[test]
    fn ppm_term_dominates_at_high_mass() {
        let d = Deviation::new(10.0, da(0.0002));
        let window = d.allowed_deviation(da(1000.0));
        assert!((window.value - 0.01).abs() < 1e-9);
    }

    #[test]
    fn absolute_floor_dominates_at_low_mass() {
        let d = Deviation::new(10.0, da(0.0002));
        let window = d.allowed_deviation(da(1.0));
        assert!((window.value - 0.0002).abs() < 1e-9);
    }

    #[test]
    fn boundary_is_closed() {
        let d = Deviation::new(0.0, da(0.001));
        assert!(d.contains(da(100.001), da(100.0)));
        assert!(!d.contains(da(100.001_001), da(100.0)));
    }

    #[test]
    fn symmetric_around_reference() {
        let d = Deviation::new(5.0, da(0.001));
        let (lower, upper) = d.bounds(da(500.0));
        let mid = (lower.value + upper.value) / 2.0;
        assert!((mid - 500.0).abs() < 1e-9);
    }
}
