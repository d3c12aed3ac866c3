//! Isotope pattern simulation and MS1-based candidate scoring.
mod simulate;

pub use simulate::{simulate_isotope_pattern, simulate_isotope_pattern_spectrum};

use crate::decomposer;
use crate::formula::MolecularFormula;
use crate::ionization::PrecursorIonType;
use crate::spectrum::{Peak, Spectrum};
use crate::system::{da, Mass, OrderedMass, OrderedScore};
use crate::tolerance::Deviation;

/// A candidate formula paired with its log-likelihood score against an observed isotope pattern.
#[derive(Clone, PartialEq, Debug)]
pub struct ScoredMolecularFormula {
    /// The candidate neutral formula.
    pub formula: MolecularFormula,
    /// Its log-likelihood score against the pattern it was scored against.
    pub score: f64,
}

/// One plausible isotope pattern extracted from an MS1 spectrum: the monoisotopic peak's mass,
/// scored candidate formulas explaining it, and the best of those scores.
#[derive(Clone, PartialEq, Debug)]
pub struct IsotopePattern {
    /// The mass of the putative monoisotopic peak.
    pub monoisotopic_mass: Mass,
    /// Candidate formulas and their scores against this pattern, sorted by descending score.
    pub candidates: Vec<ScoredMolecularFormula>,
    /// The score of the best candidate (0 if there are none).
    pub best_score: f64,
}

/// Scan an MS1 spectrum for peak clusters spaced roughly 1 Da apart around `ion_type`-adjusted
/// candidate monoisotopic masses, and emit one [`IsotopePattern`] per plausible cluster. Clusters
/// are seeded by each peak in turn; a peak only seeds a cluster when the next peak in the
/// spectrum is approximately one neutron heavier.
pub fn extract_patterns(ms1: &Spectrum, ms1_deviation: Deviation) -> Vec<Vec<Peak>> {
    const NEUTRON_MASS: f64 = 1.002_88;
    let peaks = ms1.peaks();
    let mut patterns = Vec::new();
    for start in 0..peaks.len() {
        let mut cluster = vec![peaks[start]];
        let mut cursor = start;
        while cursor + 1 < peaks.len() {
            let gap = peaks[cursor + 1].mz().value - peaks[cursor].mz().value;
            let window = ms1_deviation.allowed_deviation(da(peaks[cursor].mz().value)).value;
            if (gap - NEUTRON_MASS).abs() <= window.max(0.02) {
                cluster.push(peaks[cursor + 1]);
                cursor += 1;
            } else {
                break;
            }
        }
        patterns.push(cluster);
    }
    patterns
}

/// Score candidate formulas for the monoisotopic peak of each extracted cluster against the
/// formula's simulated isotope distribution, using a Gaussian mass-error term and a log-normal
/// intensity term.
pub fn score_patterns(
    clusters: &[Vec<Peak>],
    ion_type: &PrecursorIonType,
    constraints: &crate::constraints::FormulaConstraints,
    deviation: Deviation,
) -> Vec<IsotopePattern> {
    let mut by_mass: std::collections::BTreeMap<OrderedMass, IsotopePattern> = std::collections::BTreeMap::new();
    for cluster in clusters.iter().filter(|c| !c.is_empty()) {
        let monoisotopic_peak = cluster[0];
        let monoisotopic_mass = ion_type.ion_to_neutral_mass(da(monoisotopic_peak.mz().value));
        let candidate_formulas = decomposer::decompose(monoisotopic_mass, constraints, deviation);
        let mut candidates: Vec<ScoredMolecularFormula> = candidate_formulas
            .into_iter()
            .map(|formula| {
                let score = score_formula_against_cluster(&formula, cluster, monoisotopic_peak);
                ScoredMolecularFormula { formula, score }
            })
            .collect();
        candidates.sort_by_key(|c| (std::cmp::Reverse(OrderedScore::new(c.score)), c.formula.hill_notation()));
        let best_score = candidates.first().map_or(0.0, |c| c.score);
        let pattern = IsotopePattern {
            monoisotopic_mass,
            candidates,
            best_score,
        };
        // `extract_patterns` seeds a cluster at every peak, so the same monoisotopic mass can
        // surface more than once (a later, shorter cluster nested inside an earlier one); keep
        // only the best-scoring pattern per distinct mass.
        let key = OrderedMass::from(monoisotopic_mass);
        let keep = by_mass.get(&key).map_or(true, |existing| pattern.best_score > existing.best_score);
        if keep {
            by_mass.insert(key, pattern);
        }
    }
    by_mass.into_values().collect()
}

fn score_formula_against_cluster(formula: &MolecularFormula, cluster: &[Peak], monoisotopic_peak: Peak) -> f64 {
    const MASS_SIGMA: f64 = 0.003;
    const INTENSITY_SIGMA: f64 = 0.3;
    let mass_gaussian_norm = -0.5 * (2.0 * std::f64::consts::PI * MASS_SIGMA.powi(2)).ln();
    let intensity_gaussian_norm = -0.5 * (2.0 * std::f64::consts::PI * INTENSITY_SIGMA.powi(2)).ln();

    let simulated = simulate_isotope_pattern(formula, 1e-4);
    let observed_total: f64 = cluster.iter().map(Peak::intensity).sum();
    if observed_total <= 0.0 {
        return f64::NEG_INFINITY;
    }

    let mass_error =
        monoisotopic_peak.mz().value - PrecursorIonType::protonated().neutral_to_ion_mass(formula).value;
    let mass_log_likelihood = mass_gaussian_norm - 0.5 * (mass_error / MASS_SIGMA).powi(2);

    let intensity_log_likelihood: f64 = cluster
        .iter()
        .enumerate()
        .map(|(i, peak)| {
            let observed_fraction = peak.intensity() / observed_total;
            let predicted_fraction = simulated.get(i).copied().unwrap_or(0.0).max(1e-9);
            let log_ratio = (observed_fraction.max(1e-9) / predicted_fraction).ln();
            intensity_gaussian_norm - 0.5 * (log_ratio / INTENSITY_SIGMA).powi(2)
        })
        .sum();

    mass_log_likelihood + intensity_log_likelihood
}

/// Apply the pipeline's filtering rule: within the pattern with the highest `best_score`, keep
/// candidates while `score > 0 AND score/bestScore >= 0.666 AND score/previousScore >= 0.5`,
/// stopping at the first violation.
///
/// Returns the filtered `{formula -> score}` map and the best score of the winning pattern. An
/// empty `clusters`/`patterns` input yields an empty map and a best score of 0.
pub fn filter_best_pattern(patterns: &[IsotopePattern]) -> (Vec<ScoredMolecularFormula>, f64) {
    let Some(best_pattern) = patterns.iter().max_by(|a, b| a.best_score.total_cmp(&b.best_score)) else {
        return (Vec::new(), 0.0);
    };
    if best_pattern.best_score <= 0.0 {
        return (Vec::new(), best_pattern.best_score);
    }

    let mut kept = Vec::new();
    let mut previous_score = best_pattern.best_score;
    for candidate in &best_pattern.candidates {
        let passes = candidate.score > 0.0
            && candidate.score / best_pattern.best_score >= 0.666
            && candidate.score / previous_score >= 0.5;
        if !passes {
            break;
        }
        kept.push(candidate.clone());
        previous_score = candidate.score;
    }
    log::debug!("isotope pattern filter: best_score={:.3}, kept {} of {} candidates", best_pattern.best_score, kept.len(), best_pattern.candidates.len());
    (kept, best_pattern.best_score)
}

/// `true` iff more than one pattern has a positive best score: an ambiguous precursor mass that
/// cannot be resolved without an explicit `ionMass`.
pub fn is_ambiguous(patterns: &[IsotopePattern]) -> bool {
    patterns.iter().filter(|p| p.best_score > 0.0).count() > 1
}

/// Render a cluster of raw MS1 peaks as a normalized [`Spectrum`], relative to its first peak's
/// m/z (offsets 0, 1, 2, ... Da), for comparison/rendering purposes.
pub fn cluster_as_spectrum(cluster: &[Peak]) -> Spectrum {
    Spectrum::from_peaks(cluster.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::FormulaConstraints;
    use crate::element::Element;
    use crate::system::da as mass;

    fn glucose() -> MolecularFormula {
        MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)])
    }

    #[test]
    fn extract_groups_consecutive_neutron_spaced_peaks() {
        let ms1 = Spectrum::wrap(&[181.0707, 182.074, 183.077], &[1.0, 0.07, 0.01]);
        let clusters = extract_patterns(&ms1, Deviation::new(10.0, mass(0.01)));
        assert!(clusters.iter().any(|c| c.len() == 3));
    }

    #[test]
    fn scoring_prefers_the_true_formula() {
        let ion_type = PrecursorIonType::protonated();
        let ion_mass = ion_type.neutral_to_ion_mass(&glucose()).value;
        let ms1 = Spectrum::wrap(&[ion_mass, ion_mass + 1.00288], &[1.0, 0.065]);
        let clusters = extract_patterns(&ms1, Deviation::new(10.0, mass(0.01)));
        let patterns = score_patterns(&clusters, &ion_type, &FormulaConstraints::default(), Deviation::new(5.0, mass(0.001)));
        let (kept, _) = filter_best_pattern(&patterns);
        assert!(kept.iter().any(|c| c.formula == glucose()));
    }

    #[test]
    fn ambiguous_when_two_patterns_score_positively() {
        let a = IsotopePattern {
            monoisotopic_mass: mass(180.0),
            candidates: vec![],
            best_score: 5.0,
        };
        let b = IsotopePattern {
            monoisotopic_mass: mass(181.0),
            candidates: vec![],
            best_score: 5.0,
        };
        assert!(is_ambiguous(&[a, b]));
    }

    #[test]
    fn single_positive_pattern_is_not_ambiguous() {
        let a = IsotopePattern {
            monoisotopic_mass: mass(180.0),
            candidates: vec![],
            best_score: 5.0,
        };
        assert!(!is_ambiguous(std::slice::from_ref(&a)));
    }
}
