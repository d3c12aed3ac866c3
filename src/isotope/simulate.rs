//! Theoretical isotope distribution simulation, adapted from the binomial-convolution approach
//! of `rustyms::isotopes`.
use ndarray::{arr1, concatenate, s, Array1, Axis};
use probability::distribution::{Binomial, Discrete};
use std::cmp::Ordering;

use crate::formula::MolecularFormula;
use crate::ionization::PrecursorIonType;
use crate::spectrum::Spectrum;

/// The isotopic distribution of `formula`, as a vector of probabilities indexed by mass offset
/// in Da from the monoisotopic peak (index 0). Normalizes to approximately 1 total area; entries
/// contributing less than `threshold` to the tail of any single element's binomial are dropped.
///
/// This mirrors `rustyms`'s per-element binomial convolution: every element with more than one
/// naturally-occurring isotope contributes a binomial distribution over "how many atoms of this
/// element are the heavier isotope", and those per-element distributions are convolved together.
pub fn isotopic_distribution(formula: &MolecularFormula, threshold: f64) -> Array1<f64> {
    let mut result = arr1(&[1.0]);
    for (element, amount) in formula.elements() {
        if amount == 0 {
            continue;
        }
        let amount = amount as usize;
        let isotopes: Vec<_> = element.isotopes().iter().filter(|i| i.2 != 0.0).collect();
        if isotopes.len() < 2 {
            continue;
        }
        let base = isotopes[0];
        let heavier: Vec<(u16, f64)> = isotopes[1..].iter().map(|i| (i.0 - base.0, i.2)).collect();

        for (offset, abundance) in heavier {
            let binomial = Binomial::new(amount, abundance);
            let tail = (0..=amount)
                .rev()
                .map(|t| binomial.mass(t))
                .take_while(|a| *a < threshold)
                .count();

            let mut distribution: Array1<f64> = (0..=amount - tail)
                .map(|t| binomial.mass(t))
                .flat_map(|a| std::iter::once(a).chain(std::iter::repeat(0.0)).take(offset as usize))
                .collect();

            match result.len().cmp(&distribution.len()) {
                Ordering::Less => {
                    result
                        .append(Axis(0), Array1::zeros(distribution.len() - result.len()).view())
                        .expect("equal-rank arrays");
                }
                Ordering::Greater => {
                    distribution
                        .append(Axis(0), Array1::zeros(result.len() - distribution.len()).view())
                        .expect("equal-rank arrays");
                }
                Ordering::Equal => (),
            }

            let mut convolved = Array1::zeros(result.len());
            for (i, a) in distribution.into_iter().enumerate() {
                convolved += &(concatenate(Axis(0), &[Array1::zeros(i).view(), result.slice(s![0..result.len() - i])])
                    .expect("equal-rank arrays")
                    * a);
            }
            result = convolved;
        }
    }
    result
}

/// A convenience wrapper producing a theoretical MS1 [`Spectrum`] for `formula` under
/// `ion_type`, with one peak per isotope offset at the corresponding ion m/z.
pub fn simulate_isotope_pattern_spectrum(formula: &MolecularFormula, ion_type: &PrecursorIonType) -> Spectrum {
    let distribution = isotopic_distribution(formula, 1e-6);
    let monoisotopic_ion_mass = ion_type.neutral_to_ion_mass(formula).value;
    let mz_values: Vec<f64> = (0..distribution.len())
        .map(|i| monoisotopic_ion_mass + f64::from(i as u32) * 1.002_88)
        .collect();
    let mut spectrum = Spectrum::wrap(&mz_values, distribution.as_slice().unwrap_or(&[]));
    if spectrum.is_empty() {
        spectrum = Spectrum::wrap(&[monoisotopic_ion_mass], &[1.0]);
    }
    spectrum
}

/// The plain probability vector, as used by [`super::score_patterns`]'s intensity comparison.
pub fn simulate_isotope_pattern(formula: &MolecularFormula, threshold: f64) -> Vec<f64> {
    isotopic_distribution(formula, threshold).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    #[test]
    fn monoisotopic_peak_dominates_for_small_formula() {
        let water = MolecularFormula::new([(Element::H, 2), (Element::O, 1)]);
        let dist = isotopic_distribution(&water, 1e-6);
        assert!(dist[0] > 0.9);
    }

    #[test]
    fn distribution_sums_close_to_one() {
        let glucose = MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)]);
        let dist = isotopic_distribution(&glucose, 1e-6);
        let total: f64 = dist.sum();
        assert!((total - 1.0).abs() < 0.05);
    }

    #[test]
    fn spectrum_has_correct_monoisotopic_mz() {
        let glucose = MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)]);
        let spectrum = simulate_isotope_pattern_spectrum(&glucose, &PrecursorIonType::protonated());
        assert!((spectrum.peaks()[0].mz().value - 181.0707).abs() < 1e-3);
    }
}
