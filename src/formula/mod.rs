//! Molecular formulas: immutable, non-negative integer compositions over the fixed element
//! alphabet of [`crate::element`].

mod parse;
pub use parse::parse_formula;

use crate::element::Element;
use crate::system::{da, fraction, Mass, Ratio};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// An immutable vector of non-negative integer element counts.
///
/// Internally kept sorted by [`Element`] and with zero-count entries removed, so that
/// `PartialEq`/`Eq`/`Hash` are simple structural (component-wise) comparisons, matching the
/// spec's definition of formula equality.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct MolecularFormula {
    counts: Vec<(Element, u32)>,
}

impl MolecularFormula {
    /// An empty formula (mass zero).
    pub fn empty() -> Self {
        Self { counts: Vec::new() }
    }

    /// Build a formula from `(element, count)` pairs; zero counts are dropped, repeated elements
    /// are summed, and the result is stored in canonical sorted order.
    pub fn new(counts: impl IntoIterator<Item = (Element, u32)>) -> Self {
        let mut merged: Vec<(Element, u32)> = Vec::new();
        for (element, count) in counts {
            if let Some(existing) = merged.iter_mut().find(|(e, _)| *e == element) {
                existing.1 += count;
            } else if count > 0 {
                merged.push((element, count));
            }
        }
        merged.retain(|(_, n)| *n > 0);
        merged.sort_by_key(|(e, _)| *e);
        Self { counts: merged }
    }

    /// Iterate over the `(element, count)` pairs of this formula, in canonical order.
    pub fn elements(&self) -> impl Iterator<Item = (Element, u32)> + '_ {
        self.counts.iter().copied()
    }

    /// The count of a single element (0 if absent).
    pub fn count(&self, element: Element) -> u32 {
        self.counts
            .iter()
            .find(|(e, _)| *e == element)
            .map_or(0, |(_, n)| *n)
    }

    /// `true` iff every element count is zero.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The monoisotopic mass of this formula.
    pub fn monoisotopic_mass(&self) -> Mass {
        let mut mass = da(0.0);
        for (element, n) in &self.counts {
            mass += element.monoisotopic_mass() * Ratio::new::<fraction>(f64::from(*n));
        }
        mass
    }

    /// The natural-abundance-weighted average mass.
    pub fn average_weight(&self) -> Mass {
        let mut mass = da(0.0);
        for (element, n) in &self.counts {
            mass += element.average_weight() * Ratio::new::<fraction>(f64::from(*n));
        }
        mass
    }

    /// `self + rhs`, merging counts.
    #[must_use]
    pub fn add(&self, rhs: &Self) -> Self {
        Self::new(self.elements().chain(rhs.elements()))
    }

    /// `self - rhs`. Returns `None` if any resulting element count would go negative, per the
    /// spec's "saturating to failure" subtraction rule — this is never a panic, because a
    /// neutral loss is only ever subtracted from a formula already known (by construction of
    /// the fragmentation DAG) to contain it, and callers that are *not* sure should use this
    /// checked form instead of assuming success.
    #[must_use]
    pub fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        let mut result = self.counts.clone();
        for (element, n) in rhs.elements() {
            match result.iter_mut().find(|(e, _)| *e == element) {
                Some(entry) if entry.1 >= n => entry.1 -= n,
                _ => return None,
            }
        }
        result.retain(|(_, n)| *n > 0);
        Some(Self { counts: result })
    }

    /// `true` iff `other` is a (non-strict) subset of `self`: every element count in `other` is
    /// at most the corresponding count in `self`.
    pub fn contains(&self, other: &Self) -> bool {
        other.elements().all(|(e, n)| self.count(e) >= n)
    }

    /// `true` iff `other` is a *strict* subset: a subset, and not equal.
    pub fn strictly_contains(&self, other: &Self) -> bool {
        self.contains(other) && self != other
    }

    /// Degree of (ring plus double) unsaturation, using the standard valence formula restricted
    /// to the elements this crate's alphabet supports (H, halogens monovalent; N, P trivalent;
    /// C tetravalent; O, S divalent and so contribute nothing).
    pub fn ring_double_bond_equivalents(&self) -> f64 {
        let c = f64::from(self.count(Element::C));
        let n = f64::from(self.count(Element::N)) + f64::from(self.count(Element::P));
        let h = f64::from(self.count(Element::H))
            + f64::from(self.count(Element::F))
            + f64::from(self.count(Element::Cl))
            + f64::from(self.count(Element::Br))
            + f64::from(self.count(Element::I));
        1.0 + c - h / 2.0 + n / 2.0
    }

    /// Render in [Hill notation](https://en.wikipedia.org/wiki/Chemical_formula#Hill_system):
    /// carbon first, then hydrogen, then all other elements in alphabetical symbol order.
    pub fn hill_notation(&self) -> String {
        let mut ordered: Vec<(Element, u32)> = self.counts.clone();
        ordered.sort_by_key(|(e, _)| match e {
            Element::C => (0u8, String::new()),
            Element::H => (1u8, String::new()),
            other => (2u8, other.symbol().to_string()),
        });
        let mut out = String::new();
        for (element, n) in ordered {
            if element == Element::Electron {
                continue;
            }
            if n == 1 {
                write!(out, "{element}").unwrap();
            } else {
                write!(out, "{element}{n}").unwrap();
            }
        }
        out
    }
}

impl std::fmt::Display for MolecularFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hill_notation())
    }
}

impl std::iter::Sum for MolecularFormula {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::empty(), |acc, f| acc.add(&f))
    }
}
