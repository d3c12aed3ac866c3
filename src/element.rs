//! A fixed periodic-table stand-in.
//!
//! The full periodic table (with arbitrary isotope labelling, as in `rustyms::element`) is out
//! of scope here. What remains is a small,
//! immutable, interned catalog of the elements that realistically occur in small-molecule
//! metabolite formulas, each carrying its natural-abundance isotope vector so the isotope
//! pattern analyzer (`crate::isotope`) can simulate distributions without any other dependency.

use crate::system::{da, Mass};
use serde::{Deserialize, Serialize};

/// One of the elements in the fixed alphabet this crate understands.
///
/// Ordered as in the periodic table among the supported elements; this ordering is also the
/// canonical Hill-adjacent ordering used when a formula needs a deterministic element order
/// beyond the C/H-first Hill convention (`MolecularFormula::hill_order`).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Element {
    /// Hydrogen
    H,
    /// Carbon
    C,
    /// Nitrogen
    N,
    /// Oxygen
    O,
    /// Phosphorus
    P,
    /// Sulfur
    S,
    /// Fluorine
    F,
    /// Chlorine
    Cl,
    /// Bromine
    Br,
    /// Iodine
    I,
    /// Sodium
    Na,
    /// Potassium
    K,
    /// Calcium
    Ca,
    /// Iron
    Fe,
    /// Selenium
    Se,
    /// The free electron, used to express the mass defect of an ion's charge carriers.
    Electron,
}

/// All elements in this crate's fixed alphabet, in canonical order.
pub const ELEMENTS: [Element; 16] = [
    Element::H,
    Element::C,
    Element::N,
    Element::O,
    Element::P,
    Element::S,
    Element::F,
    Element::Cl,
    Element::Br,
    Element::I,
    Element::Na,
    Element::K,
    Element::Ca,
    Element::Fe,
    Element::Se,
    Element::Electron,
];

/// `(mass number, monoisotopic mass in Da, natural abundance fraction)` for one isotope.
pub type Isotope = (u16, f64, f64);

struct ElementData {
    symbol: &'static str,
    average_weight: f64,
    isotopes: &'static [Isotope],
}

const ELECTRON_MASS: f64 = 5.485_799_090_65e-4;

const fn data(element: Element) -> &'static ElementData {
    match element {
        Element::H => &ElementData {
            symbol: "H",
            average_weight: 1.007_94,
            isotopes: &[(1, 1.007_825_031_898, 0.999_885), (2, 2.014_101_777_844, 0.000_115)],
        },
        Element::C => &ElementData {
            symbol: "C",
            average_weight: 12.0107,
            isotopes: &[(12, 12.0, 0.9893), (13, 13.003_354_835_07, 0.0107)],
        },
        Element::N => &ElementData {
            symbol: "N",
            average_weight: 14.0067,
            isotopes: &[(14, 14.003_074_004_43, 0.996_36), (15, 15.000_108_898_88, 0.003_64)],
        },
        Element::O => &ElementData {
            symbol: "O",
            average_weight: 15.9994,
            isotopes: &[
                (16, 15.994_914_619_57, 0.99757),
                (17, 16.999_131_755_7, 0.00038),
                (18, 17.999_159_612_8, 0.00205),
            ],
        },
        Element::P => &ElementData {
            symbol: "P",
            average_weight: 30.973_762,
            isotopes: &[(31, 30.973_761_998_42, 1.0)],
        },
        Element::S => &ElementData {
            symbol: "S",
            average_weight: 32.065,
            isotopes: &[
                (32, 31.972_071_174_4, 0.9499),
                (33, 32.971_458_910_1, 0.0075),
                (34, 33.967_867_011_7, 0.0425),
                (36, 35.967_080_699_6, 0.0001),
            ],
        },
        Element::F => &ElementData {
            symbol: "F",
            average_weight: 18.998_403_163,
            isotopes: &[(19, 18.998_403_162_73, 1.0)],
        },
        Element::Cl => &ElementData {
            symbol: "Cl",
            average_weight: 35.453,
            isotopes: &[(35, 34.968_852_694, 0.7576), (37, 36.965_902_584, 0.2424)],
        },
        Element::Br => &ElementData {
            symbol: "Br",
            average_weight: 79.904,
            isotopes: &[(79, 78.918_337_87, 0.5069), (81, 80.916_289_7, 0.4931)],
        },
        Element::I => &ElementData {
            symbol: "I",
            average_weight: 126.904_47,
            isotopes: &[(127, 126.904_472_98, 1.0)],
        },
        Element::Na => &ElementData {
            symbol: "Na",
            average_weight: 22.989_769_28,
            isotopes: &[(23, 22.989_769_282_02, 1.0)],
        },
        Element::K => &ElementData {
            symbol: "K",
            average_weight: 39.0983,
            isotopes: &[
                (39, 38.963_706_487, 0.932_581),
                (40, 39.963_998_166, 0.000_117),
                (41, 40.961_825_258, 0.067_302),
            ],
        },
        Element::Ca => &ElementData {
            symbol: "Ca",
            average_weight: 40.078,
            isotopes: &[(40, 39.962_590_863_8, 0.96941)],
        },
        Element::Fe => &ElementData {
            symbol: "Fe",
            average_weight: 55.845,
            isotopes: &[
                (54, 53.939_608_11, 0.05845),
                (56, 55.934_935_537, 0.91754),
                (57, 56.935_392_07, 0.02119),
            ],
        },
        Element::Se => &ElementData {
            symbol: "Se",
            average_weight: 78.971,
            isotopes: &[
                (78, 77.917_309_15, 0.2377),
                (80, 79.916_521_8, 0.4961),
            ],
        },
        Element::Electron => &ElementData {
            symbol: "e",
            average_weight: ELECTRON_MASS,
            isotopes: &[(0, ELECTRON_MASS, 1.0)],
        },
    }
}

impl Element {
    /// The symbol used in Hill-notation formula strings, e.g. "Cl".
    pub const fn symbol(self) -> &'static str {
        data(self).symbol
    }

    /// All naturally-occurring isotopes of this element, heaviest-abundance-first is *not*
    /// guaranteed; the first entry is always the lowest mass number (the monoisotopic species).
    pub fn isotopes(self) -> &'static [Isotope] {
        data(self).isotopes
    }

    /// The monoisotopic mass: the mass of the lowest-mass-number naturally occurring isotope.
    pub fn monoisotopic_mass(self) -> Mass {
        da(data(self).isotopes[0].1)
    }

    /// The natural-abundance-weighted average mass.
    pub fn average_weight(self) -> Mass {
        da(data(self).average_weight)
    }

    /// Look up an element by its symbol (case sensitive, as in a chemical formula).
    pub fn by_symbol(symbol: &str) -> Option<Self> {
        ELEMENTS.into_iter().find(|e| e.symbol() == symbol)
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_round_trips_symbol() {
        for e in ELEMENTS {
            assert_eq!(Element::by_symbol(e.symbol()), Some(e));
        }
    }

    #[test]
    fn carbon_monoisotopic_mass_is_exact() {
        assert!((Element::C.monoisotopic_mass().value - 12.0).abs() < 1e-9);
    }

    #[test]
    fn isotope_abundances_sum_close_to_one() {
        for e in ELEMENTS {
            let total: f64 = e.isotopes().iter().map(|i| i.2).sum();
            assert!((total - 1.0).abs() < 0.01, "{e:?} sums to {total}");
        }
    }
}
