//! Merges and normalizes MS2 peaks across spectra, then decomposes each merged peak into its
//! plausible sub-formulas.
use crate::constraints::FormulaConstraints;
use crate::decomposer;
use crate::formula::MolecularFormula;
use crate::ionization::PrecursorIonType;
use crate::spectrum::{Ms2Experiment, Peak};
use crate::system::da;
use crate::tolerance::Deviation;

/// A set of candidate sub-formulas for one merged peak, each paired with a score (currently the
/// formula's fit quality against the peak's mass; downstream scorers in
/// [`crate::graph::scorer`] layer additional terms on top).
#[derive(Clone, PartialEq, Debug)]
pub struct DecompositionList {
    /// The merged peak these decompositions explain.
    pub peak: Peak,
    /// Candidate sub-formulas, in no particular guaranteed order (the DAG builder re-sorts).
    pub formulas: Vec<MolecularFormula>,
}

/// An [`Ms2Experiment`] after peak merging, normalization, and decomposition.
#[derive(Clone, PartialEq, Debug)]
pub struct ProcessedInput {
    /// The merged, normalized MS2 peak list.
    pub peaks: Vec<Peak>,
    /// Per-peak candidate sub-formulas.
    pub decompositions: Vec<DecompositionList>,
    /// Index into `peaks`/`decompositions` of the parent (precursor) peak, if one was found.
    pub parent_peak_index: Option<usize>,
}

/// Merge `experiment`'s MS2 spectra into one peak list (binning peaks within `deviation` of each
/// other and summing their intensities), normalize by total intensity, then decompose every
/// merged peak's neutral mass (under `ion_type`) against `precursor_formula`'s subset structure
/// and `constraints`.
///
/// Sub-formulas are restricted to those contained in `precursor_formula` (the "parent-peak
/// decompositions dominate" rule): a peak heavier than the precursor, or whose only
/// consistent decompositions are not subsets of `precursor_formula`, ends up with an empty
/// [`DecompositionList`].
pub fn process(
    experiment: &Ms2Experiment,
    precursor_formula: &MolecularFormula,
    ion_type: &PrecursorIonType,
    constraints: &FormulaConstraints,
    deviation: Deviation,
) -> ProcessedInput {
    let merged = merge_peaks(experiment, deviation);
    let normalized = normalize(&merged);

    let ion_mass = experiment.ion_mass();
    let parent_peak_index = normalized
        .iter()
        .position(|p| deviation.contains(da(p.mz().value), da(ion_mass.value)));

    let decompositions = normalized
        .iter()
        .map(|&peak| {
            let neutral_mass = ion_type.ion_to_neutral_mass(da(peak.mz().value));
            let candidates = decomposer::decompose(neutral_mass, constraints, deviation);
            let formulas = candidates
                .into_iter()
                .filter(|f| precursor_formula.contains(f))
                .collect();
            DecompositionList { peak, formulas }
        })
        .collect();

    ProcessedInput {
        peaks: normalized,
        decompositions,
        parent_peak_index,
    }
}

fn merge_peaks(experiment: &Ms2Experiment, deviation: Deviation) -> Vec<Peak> {
    let mut all_peaks: Vec<Peak> = experiment.ms2().iter().flat_map(|s| s.peaks().iter().copied()).collect();
    all_peaks.sort_by(|a, b| a.mz().value.total_cmp(&b.mz().value));

    let mut merged: Vec<Peak> = Vec::new();
    for peak in all_peaks {
        match merged.last_mut() {
            Some(last) if deviation.contains(da(peak.mz().value), da(last.mz().value)) => {
                let total_intensity = last.intensity() + peak.intensity();
                let weighted_mz = (last.mz().value * last.intensity() + peak.mz().value * peak.intensity())
                    / total_intensity.max(f64::EPSILON);
                *last = Peak::new(crate::system::MassOverCharge::new::<crate::system::mz>(weighted_mz), total_intensity);
            }
            _ => merged.push(peak),
        }
    }
    merged
}

fn normalize(peaks: &[Peak]) -> Vec<Peak> {
    let total: f64 = peaks.iter().map(Peak::intensity).sum();
    if total <= 0.0 {
        return peaks.to_vec();
    }
    peaks
        .iter()
        .map(|p| Peak::new(p.mz(), p.intensity() / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::spectrum::Spectrum;
    use crate::system::{mz, MassOverCharge};

    fn glucose() -> MolecularFormula {
        MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)])
    }

    #[test]
    fn merges_close_peaks_and_normalizes() {
        let ms2 = Spectrum::wrap(&[181.0705, 181.0709, 85.028], &[0.5, 0.5, 0.4]);
        let experiment = Ms2Experiment::new("glucose", vec![ms2], MassOverCharge::new::<mz>(181.0707));
        let processed = process(
            &experiment,
            &glucose(),
            &PrecursorIonType::protonated(),
            &FormulaConstraints::default(),
            Deviation::new(10.0, da(0.001)),
        );
        assert_eq!(processed.peaks.len(), 2);
        let total: f64 = processed.peaks.iter().map(Peak::intensity).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decompositions_are_subsets_of_precursor_formula() {
        let ms2 = Spectrum::wrap(&[181.0707, 163.06, 85.028], &[1.0, 0.6, 0.4]);
        let experiment = Ms2Experiment::new("glucose", vec![ms2], MassOverCharge::new::<mz>(181.0707));
        let processed = process(
            &experiment,
            &glucose(),
            &PrecursorIonType::protonated(),
            &FormulaConstraints::default(),
            Deviation::new(10.0, da(0.001)),
        );
        for d in &processed.decompositions {
            for f in &d.formulas {
                assert!(glucose().contains(f));
            }
        }
    }

    #[test]
    fn finds_parent_peak() {
        let ms2 = Spectrum::wrap(&[181.0707, 85.028], &[1.0, 0.4]);
        let experiment = Ms2Experiment::new("glucose", vec![ms2], MassOverCharge::new::<mz>(181.0707));
        let processed = process(
            &experiment,
            &glucose(),
            &PrecursorIonType::protonated(),
            &FormulaConstraints::default(),
            Deviation::new(10.0, da(0.001)),
        );
        assert!(processed.parent_peak_index.is_some());
    }
}
