//! Enumerates integer-composition molecular formulas whose mass falls within a tolerance window
//! of a target, in the style of Böcker & Lipták's round-robin DP over a fixed element alphabet.
use crate::constraints::FormulaConstraints;
use crate::element::Element;
use crate::formula::MolecularFormula;
use crate::ionization::PrecursorIonType;
use crate::system::Mass;
use crate::tolerance::Deviation;

/// Enumerate every formula over `constraints.alphabet()` whose monoisotopic mass lies within
/// `deviation` of `target_mass`, in deterministic lexicographic (alphabet) order.
///
/// Returns an empty vector when no formula satisfies the constraints — this is not an error.
pub fn decompose(target_mass: Mass, constraints: &FormulaConstraints, deviation: Deviation) -> Vec<MolecularFormula> {
    let alphabet: Vec<Element> = constraints.alphabet().collect();
    if alphabet.is_empty() {
        return Vec::new();
    }
    let window = deviation.allowed_deviation(target_mass);
    let lower = (target_mass - window).value;
    let upper = (target_mass + window).value;

    let masses: Vec<f64> = alphabet.iter().map(|e| e.monoisotopic_mass().value).collect();
    let bounds: Vec<u32> = alphabet.iter().map(|e| constraints.upper_bound(*e)).collect();

    let mut results = Vec::new();
    let mut current = vec![0u32; alphabet.len()];
    decompose_recursive(&masses, &bounds, 0, 0.0, lower, upper, &mut current, &mut results);

    let formulas: Vec<MolecularFormula> = results
        .into_iter()
        .map(|counts| MolecularFormula::new(alphabet.iter().copied().zip(counts)))
        .filter(|f| constraints.satisfied_by(f))
        .collect();
    log::debug!("decompose: target={target_mass:?}, window=[{lower:.6}, {upper:.6}], candidates={}", formulas.len());
    formulas
}

/// `decompose`, but for an observed ion mass: converts to the neutral mass under `ion_type`
/// before decomposing over `constraints`'s alphabet.
pub fn decompose_ion(
    ion_mass: Mass,
    ion_type: &PrecursorIonType,
    constraints: &FormulaConstraints,
    deviation: Deviation,
) -> Vec<MolecularFormula> {
    let neutral_mass = ion_type.ion_to_neutral_mass(ion_mass);
    decompose(neutral_mass, constraints, deviation)
}

#[allow(clippy::too_many_arguments)]
fn decompose_recursive(
    masses: &[f64],
    bounds: &[u32],
    index: usize,
    accumulated_mass: f64,
    lower: f64,
    upper: f64,
    current: &mut Vec<u32>,
    results: &mut Vec<Vec<u32>>,
) {
    if index == masses.len() {
        if accumulated_mass >= lower && accumulated_mass <= upper {
            results.push(current.clone());
        }
        return;
    }

    let max_count_by_mass = if masses[index] > 0.0 {
        ((upper - accumulated_mass) / masses[index]).floor().max(-1.0)
    } else {
        f64::from(bounds[index])
    };
    if max_count_by_mass < 0.0 {
        return;
    }
    let max_count = bounds[index].min(max_count_by_mass as u32);

    for count in 0..=max_count {
        current[index] = count;
        let mass = accumulated_mass + f64::from(count) * masses[index];
        if mass > upper {
            break;
        }
        decompose_recursive(masses, bounds, index + 1, mass, lower, upper, current, results);
    }
    current[index] = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::da;

    #[test]
    fn decomposes_glucose_mass() {
        let constraints = FormulaConstraints::default();
        let deviation = Deviation::new(5.0, da(0.001));
        let glucose = MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)]);
        let results = decompose(glucose.monoisotopic_mass(), &constraints, deviation);
        assert!(results.contains(&glucose));
    }

    #[test]
    fn output_is_deterministic_and_deduplicated() {
        let constraints = FormulaConstraints::chnops(10);
        let deviation = Deviation::new(20.0, da(0.01));
        let results_a = decompose(da(150.0), &constraints, deviation);
        let results_b = decompose(da(150.0), &constraints, deviation);
        assert_eq!(results_a, results_b);
        let mut deduped = results_a.clone();
        deduped.dedup();
        assert_eq!(results_a.len(), deduped.len());
    }

    #[test]
    fn infeasible_constraints_produce_empty_not_error() {
        let constraints = FormulaConstraints::new([(Element::Fe, 1)]);
        let deviation = Deviation::new(1.0, da(0.0001));
        let results = decompose(da(180.0634), &constraints, deviation);
        assert!(results.is_empty());
    }

    #[test]
    fn all_results_are_within_window() {
        let constraints = FormulaConstraints::chnops(12);
        let deviation = Deviation::new(10.0, da(0.001));
        let target = da(180.0634);
        for formula in decompose(target, &constraints, deviation) {
            assert!(deviation.contains(formula.monoisotopic_mass(), target));
        }
    }

    #[test]
    fn ion_decomposition_round_trips_through_protonation() {
        let ion_type = PrecursorIonType::protonated();
        let constraints = FormulaConstraints::default();
        let deviation = Deviation::new(5.0, da(0.001));
        let glucose = MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)]);
        let ion_mass = ion_type.neutral_to_ion_mass(&glucose);
        let results = decompose_ion(ion_mass, &ion_type, &constraints, deviation);
        assert!(results.contains(&glucose));
    }
}
