//! Immutable per-run configuration: allowed mass deviation, alphabet constraints, and scorer
//! parameter sets.
//!
//! Mirrors `rustyms::model::Model`'s role (a serde-backed, preset-driven configuration bag) but
//! scoped to this crate's decomposition/scoring parameters. Treated as copy-on-write: every
//! mutator takes `&self` and returns a new, independent `MeasurementProfile`.
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constraints::FormulaConstraints;
use crate::system::da;
use crate::tolerance::Deviation;

/// How the isotope pattern analyzer's output is used by the identification pipeline.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum IsotopePatternHandling {
    /// Ignore MS1 entirely.
    Omit,
    /// Restrict candidate formulas to the isotope-filtered set.
    Filter,
    /// Filter (when the best isotope score exceeds 10) and add an isotope score to each tree.
    Score,
}

/// Parameters for [`crate::recalibration`]'s median-slope robust linear fit.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MedianSlopeRecalibration {
    /// ppm tolerance used when deciding whether a peak pair is an inlier.
    pub ppm: f64,
    /// Absolute tolerance floor, in Da.
    pub abs: f64,
    /// Minimum number of (observed, theoretical) pairs required per spectrum to fit.
    pub min_peaks: usize,
    /// Minimum relative intensity a peak must have to be eligible.
    pub min_intensity: f64,
}

impl Default for MedianSlopeRecalibration {
    fn default() -> Self {
        Self {
            ppm: 2.0,
            abs: 5e-4,
            min_peaks: 8,
            min_intensity: 0.01,
        }
    }
}

/// The immutable configuration bag threaded through one identification run.
///
/// Cloning is cheap: [`FormulaConstraints`] is the only potentially large field and is shared via
/// [`Arc`], so producing a modified copy (e.g. a new `tree_size_score`) never deep-copies it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MeasurementProfile {
    name: String,
    allowed_mass_deviation: Deviation,
    standard_ms1_deviation: Deviation,
    standard_ms2_deviation: Deviation,
    formula_constraints: Arc<FormulaConstraints>,
    tree_size_score: f64,
    median_slope_recalibration: MedianSlopeRecalibration,
    isotope_pattern_handling: IsotopePatternHandling,
    parallelism: usize,
}

impl MeasurementProfile {
    /// A profile tuned for quadrupole time-of-flight instruments: 10 ppm / 5e-4 Da deviation.
    pub fn qtof() -> Self {
        Self {
            name: "qtof".to_string(),
            allowed_mass_deviation: Deviation::new(10.0, da(5e-4)),
            standard_ms1_deviation: Deviation::new(10.0, da(5e-4)),
            standard_ms2_deviation: Deviation::new(10.0, da(5e-4)),
            formula_constraints: Arc::new(FormulaConstraints::default()),
            tree_size_score: 0.0,
            median_slope_recalibration: MedianSlopeRecalibration::default(),
            isotope_pattern_handling: IsotopePatternHandling::Filter,
            parallelism: 3,
        }
    }

    /// A profile tuned for Orbitrap instruments: 5 ppm deviation.
    pub fn orbitrap() -> Self {
        Self {
            name: "orbitrap".to_string(),
            allowed_mass_deviation: Deviation::from_ppm(5.0),
            standard_ms1_deviation: Deviation::from_ppm(5.0),
            standard_ms2_deviation: Deviation::from_ppm(5.0),
            ..Self::qtof()
        }
    }

    /// A profile tuned for FT-ICR instruments: also 5 ppm deviation, the tightest of the presets.
    pub fn fticr() -> Self {
        Self {
            name: "fticr".to_string(),
            ..Self::orbitrap()
        }
    }

    /// The preset's identifying name, used for workspace path construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The deviation window applied when matching a candidate formula's mass to an observed mass.
    pub const fn allowed_mass_deviation(&self) -> Deviation {
        self.allowed_mass_deviation
    }

    /// The deviation window used when clustering MS1 peaks.
    pub const fn standard_ms1_deviation(&self) -> Deviation {
        self.standard_ms1_deviation
    }

    /// The deviation window used when merging MS2 peaks.
    pub const fn standard_ms2_deviation(&self) -> Deviation {
        self.standard_ms2_deviation
    }

    /// The chemical alphabet and bounds candidate formulas must respect.
    pub fn formula_constraints(&self) -> &FormulaConstraints {
        &self.formula_constraints
    }

    /// The current tree-size bonus.
    pub const fn tree_size_score(&self) -> f64 {
        self.tree_size_score
    }

    /// A copy of this profile with a different tree-size bonus. The adaptive loop calls this
    /// each iteration to thread a new immutable value rather than mutating shared state.
    #[must_use]
    pub fn with_tree_size_score(&self, tree_size_score: f64) -> Self {
        Self {
            tree_size_score,
            ..self.clone()
        }
    }

    /// A copy of this profile with different formula constraints.
    #[must_use]
    pub fn with_formula_constraints(&self, constraints: FormulaConstraints) -> Self {
        Self {
            formula_constraints: Arc::new(constraints),
            ..self.clone()
        }
    }

    /// The recalibration fit parameters.
    pub const fn median_slope_recalibration(&self) -> MedianSlopeRecalibration {
        self.median_slope_recalibration
    }

    /// A copy of this profile with different recalibration fit parameters.
    #[must_use]
    pub fn with_median_slope_recalibration(&self, params: MedianSlopeRecalibration) -> Self {
        Self {
            median_slope_recalibration: params,
            ..self.clone()
        }
    }

    /// How MS1 isotope information should be used.
    pub const fn isotope_pattern_handling(&self) -> IsotopePatternHandling {
        self.isotope_pattern_handling
    }

    /// A copy of this profile with different isotope-pattern handling.
    #[must_use]
    pub fn with_isotope_pattern_handling(&self, handling: IsotopePatternHandling) -> Self {
        Self {
            isotope_pattern_handling: handling,
            ..self.clone()
        }
    }

    /// The target worker-pool size for per-candidate tree computation.
    pub const fn parallelism(&self) -> usize {
        self.parallelism
    }
}

impl Default for MeasurementProfile {
    fn default() -> Self {
        Self::qtof()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_tree_size_score_does_not_mutate_original() {
        let base = MeasurementProfile::qtof();
        let bumped = base.with_tree_size_score(3.0);
        assert_eq!(base.tree_size_score(), 0.0);
        assert_eq!(bumped.tree_size_score(), 3.0);
    }

    #[test]
    fn orbitrap_is_tighter_than_qtof() {
        let qtof = MeasurementProfile::qtof();
        let orbitrap = MeasurementProfile::orbitrap();
        let target = da(500.0);
        assert!(
            orbitrap.allowed_mass_deviation().allowed_deviation(target)
                < qtof.allowed_mass_deviation().allowed_deviation(target)
        );
    }

    #[test]
    fn default_parallelism_is_three() {
        assert_eq!(MeasurementProfile::qtof().parallelism(), 3);
    }
}
