//! Fits a per-spectrum mass-correction function from an explained tree's (observed,
//! theoretical) m/z pairs, using a robust median-slope linear regression.
use crate::ionization::PrecursorIonType;
use crate::profile::MedianSlopeRecalibration;
use crate::solver::FTree;

/// A fitted `observed -> corrected` linear correction: `corrected = observed * slope + intercept`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct CorrectionFunction {
    slope: f64,
    intercept: f64,
}

impl CorrectionFunction {
    /// The identity correction (no recalibration performed).
    pub const IDENTITY: Self = Self {
        slope: 1.0,
        intercept: 0.0,
    };

    /// Apply the correction to an observed m/z.
    pub fn apply(&self, observed_mz: f64) -> f64 {
        observed_mz * self.slope + self.intercept
    }
}

/// The result of recalibrating one or more MS2 spectra: a correction per input spectrum index
/// plus a merged correction fit across all of them together.
#[derive(Clone, PartialEq, Debug)]
pub struct SpectralRecalibration {
    /// Per-MS2-spectrum correction function, parallel to the experiment's MS2 list.
    pub per_spectrum: Vec<CorrectionFunction>,
    /// A single correction fit across every explained pair from every spectrum.
    pub merged: CorrectionFunction,
}

/// Collect `(observed m/z, theoretical m/z)` pairs from every fragment of `tree` under
/// `ion_type`.
fn observed_theoretical_pairs(tree: &FTree, ion_type: &PrecursorIonType) -> Vec<(f64, f64)> {
    tree.fragments
        .iter()
        .map(|f| {
            let theoretical = ion_type.neutral_to_ion_mass(&f.formula).value;
            (f.peak.mz().value, theoretical)
        })
        .collect()
}

/// Fit a median-slope robust linear regression through `pairs` (each `(x, y)` with `y` the
/// target theoretical value). Returns [`CorrectionFunction::IDENTITY`] if fewer than
/// `params.min_peaks` pairs are supplied.
fn fit_median_slope(pairs: &[(f64, f64)], params: MedianSlopeRecalibration) -> CorrectionFunction {
    if pairs.len() < params.min_peaks {
        return CorrectionFunction::IDENTITY;
    }

    let mut slopes: Vec<f64> = Vec::new();
    for i in 0..pairs.len() {
        for j in (i + 1)..pairs.len() {
            let dx = pairs[j].0 - pairs[i].0;
            if dx.abs() > 1e-9 {
                slopes.push((pairs[j].1 - pairs[i].1) / dx);
            }
        }
    }
    if slopes.is_empty() {
        return CorrectionFunction::IDENTITY;
    }
    let slope = median(&mut slopes);

    let mut intercepts: Vec<f64> = pairs.iter().map(|&(x, y)| y - slope * x).collect();
    let intercept = median(&mut intercepts);

    CorrectionFunction { slope, intercept }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Recalibrate `tree` against its explaining spectra. `spectrum_pair_groups` partitions the
/// tree's (observed, theoretical) pairs by which MS2 spectrum each fragment peak came from; the
/// caller is responsible for that grouping since trees themselves are not spectrum-aware.
pub fn recalibrate(
    tree: &FTree,
    ion_type: &PrecursorIonType,
    spectrum_peak_counts: &[usize],
    params: MedianSlopeRecalibration,
) -> SpectralRecalibration {
    let all_pairs = observed_theoretical_pairs(tree, ion_type);

    let mut per_spectrum = Vec::with_capacity(spectrum_peak_counts.len());
    let mut offset = 0usize;
    for &count in spectrum_peak_counts {
        let end = (offset + count).min(all_pairs.len());
        let slice = if offset <= end { &all_pairs[offset.min(all_pairs.len())..end] } else { &[] };
        per_spectrum.push(fit_median_slope(slice, params));
        offset += count;
    }

    let merged = fit_median_slope(&all_pairs, params);
    SpectralRecalibration { per_spectrum, merged }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::formula::MolecularFormula;
    use crate::solver::{FragmentNode, TreeScoring};
    use crate::spectrum::Peak;
    use crate::system::{mz, MassOverCharge};

    fn fragment(formula: MolecularFormula, observed_mz: f64) -> FragmentNode {
        FragmentNode {
            formula,
            peak: Peak::new(MassOverCharge::new::<mz>(observed_mz), 1.0),
        }
    }

    #[test]
    fn identity_when_too_few_peaks() {
        let glucose = MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)]);
        let tree = FTree {
            fragments: vec![fragment(glucose, 181.0708)],
            losses: vec![],
            scoring: TreeScoring::default(),
        };
        let recal = recalibrate(&tree, &PrecursorIonType::protonated(), &[1], MedianSlopeRecalibration::default());
        assert_eq!(recal.merged, CorrectionFunction::IDENTITY);
    }

    #[test]
    fn fits_a_constant_offset() {
        let ion_type = PrecursorIonType::protonated();
        let mut fragments = Vec::new();
        for n in 1..=10u32 {
            let formula = MolecularFormula::new([(Element::C, n)]);
            let theoretical = ion_type.neutral_to_ion_mass(&formula).value;
            fragments.push(fragment(formula, theoretical + 0.002));
        }
        let count = fragments.len();
        let tree = FTree {
            fragments,
            losses: vec![],
            scoring: TreeScoring::default(),
        };
        let params = MedianSlopeRecalibration {
            min_peaks: 8,
            ..MedianSlopeRecalibration::default()
        };
        let recal = recalibrate(&tree, &ion_type, &[count], params);
        assert!((recal.merged.slope - 1.0).abs() < 1e-6);
        assert!((recal.merged.intercept - (-0.002)).abs() < 1e-6);
    }
}
