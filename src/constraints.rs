//! Per-element bounds and structural filters used to restrict the decomposer's search space.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::{Context, ErrorKind, IdentificationError};
use crate::formula::MolecularFormula;

/// The chemical alphabet and per-element upper bounds a candidate formula must respect, plus
/// degree-of-unsaturation bounds used as a structural plausibility filter.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct FormulaConstraints {
    upper_bounds: BTreeMap<Element, u32>,
    min_rdbe: f64,
    max_rdbe: f64,
}

impl FormulaConstraints {
    /// A constraint set over the given alphabet, each element bounded above by `max_count`, with
    /// no RDBE filtering (`min_rdbe = -0.5`, `max_rdbe = f64::INFINITY`).
    pub fn new(alphabet: impl IntoIterator<Item = (Element, u32)>) -> Self {
        Self {
            upper_bounds: alphabet.into_iter().collect(),
            min_rdbe: -0.5,
            max_rdbe: f64::INFINITY,
        }
    }

    /// The default small-molecule alphabet: C, H, N, O, P, S each bounded by 20 atoms.
    pub fn chnops(max_count: u32) -> Self {
        Self::new([
            (Element::C, max_count),
            (Element::H, max_count),
            (Element::N, max_count),
            (Element::O, max_count),
            (Element::P, max_count),
            (Element::S, max_count),
        ])
    }

    /// Restrict the ring-double-bond-equivalent range a formula may fall in.
    #[must_use]
    pub fn with_rdbe_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_rdbe = min;
        self.max_rdbe = max;
        self
    }

    /// The elements permitted in a formula, in alphabet order.
    pub fn alphabet(&self) -> impl Iterator<Item = Element> + '_ {
        self.upper_bounds.keys().copied()
    }

    /// The alphabet together with each element's upper bound, in alphabet order.
    pub fn bounds(&self) -> impl Iterator<Item = (Element, u32)> + '_ {
        self.upper_bounds.iter().map(|(&e, &n)| (e, n))
    }

    /// The upper bound on the count of `element` (0 if `element` is not in the alphabet).
    pub fn upper_bound(&self, element: Element) -> u32 {
        self.upper_bounds.get(&element).copied().unwrap_or(0)
    }

    /// `true` iff every element of `formula` is in this alphabet, within its upper bound, and the
    /// formula's RDBE lies in `[min_rdbe, max_rdbe]`.
    pub fn satisfied_by(&self, formula: &MolecularFormula) -> bool {
        formula
            .elements()
            .all(|(e, n)| e == Element::Electron || n <= self.upper_bound(e))
            && {
                let rdbe = formula.ring_double_bond_equivalents();
                rdbe >= self.min_rdbe && rdbe <= self.max_rdbe
            }
    }
}

impl Default for FormulaConstraints {
    /// `CHNOPS[20]`, the default element alphabet and per-element bound.
    fn default() -> Self {
        Self::chnops(20)
    }
}

/// Parse a comma-separated `"Symbol:maxCount"` alphabet specification, e.g. `"C:20,H:40,N:5"`.
/// Unknown symbols or malformed counts are `InvalidInput`.
pub fn formula_constraints(spec: &str) -> Result<FormulaConstraints, IdentificationError> {
    let mut bounds = Vec::new();
    for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (symbol, count) = entry.split_once(':').ok_or_else(|| {
            IdentificationError::new(
                ErrorKind::InvalidInput,
                "malformed constraint entry",
                format!("expected `Symbol:maxCount`, found `{entry}`"),
                Context::field("formulaConstraints"),
            )
        })?;
        let element = Element::by_symbol(symbol).ok_or_else(|| {
            IdentificationError::new(
                ErrorKind::InvalidInput,
                "unknown element",
                format!("`{symbol}` is not a recognised element symbol"),
                Context::field("formulaConstraints"),
            )
        })?;
        let max_count: u32 = count.parse().map_err(|_| {
            IdentificationError::new(
                ErrorKind::InvalidInput,
                "malformed element count",
                format!("`{count}` is not a non-negative integer"),
                Context::field("formulaConstraints"),
            )
        })?;
        bounds.push((element, max_count));
    }
    Ok(FormulaConstraints::new(bounds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_alphabet_accepts_glucose() {
        let c = FormulaConstraints::default();
        let glucose = MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)]);
        assert!(c.satisfied_by(&glucose));
    }

    #[test]
    fn rejects_elements_outside_alphabet() {
        let c = FormulaConstraints::default();
        let with_sodium = MolecularFormula::new([(Element::C, 6), (Element::Na, 1)]);
        assert!(!c.satisfied_by(&with_sodium));
    }

    #[test]
    fn rejects_counts_over_bound() {
        let c = FormulaConstraints::chnops(5);
        let too_many_carbons = MolecularFormula::new([(Element::C, 6)]);
        assert!(!c.satisfied_by(&too_many_carbons));
    }

    #[test]
    fn rdbe_bounds_filter_implausible_formulas() {
        let c = FormulaConstraints::default().with_rdbe_bounds(0.0, 10.0);
        let negative_rdbe = MolecularFormula::new([(Element::H, 50)]);
        assert!(!c.satisfied_by(&negative_rdbe));
    }

    #[test]
    fn parses_alphabet_specification() {
        let c = formula_constraints("C:20,H:40,N:5").unwrap();
        assert_eq!(c.upper_bound(Element::C), 20);
        assert_eq!(c.upper_bound(Element::N), 5);
        assert_eq!(c.upper_bound(Element::O), 0);
    }

    #[test]
    fn rejects_unknown_symbol_in_specification() {
        let err = formula_constraints("Xx:5").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }
}
