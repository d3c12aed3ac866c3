//! Molecular formula identification from MS1/MS2 mass spectrometry data via fragmentation-tree
//! scoring: isotope-pattern filtering, a Böcker–Lipták-style decomposer, maximum-colorful-subtree
//! fragmentation tree search, and median-slope recalibration.
//!
//! The programmatic surface mirrors the factory-function style of a scripting-language binding:
//! [`identify`], [`identify_precursor_and_ionization`], [`compute`], [`predict_elements`],
//! [`decompose`], [`simulate_isotope_pattern`], plus small constructors (`wrap_spectrum`,
//! `parse_formula`, `parse_ionization`, `build_experiment`, `formula_constraints`) for assembling
//! inputs without hand-building every intermediate type.
#[macro_use]
extern crate uom;

pub mod constraints;
pub mod decomposer;
pub mod element;
pub mod error;
pub mod formula;
pub mod graph;
pub mod ionization;
pub mod isotope;
pub mod pipeline;
pub mod preprocess;
pub mod profile;
pub mod recalibration;
pub mod solver;
pub mod spectrum;
pub mod system;
pub mod tolerance;
pub mod workspace;

pub use constraints::{formula_constraints, FormulaConstraints};
pub use decomposer::{decompose, decompose_ion};
pub use element::Element;
pub use error::{Context, ErrorKind, IdentificationError};
pub use formula::{parse_formula, MolecularFormula};
pub use ionization::{parse_ionization, Ionization, PrecursorIonType};
pub use pipeline::{compute, identify, identify_precursor_and_ionization, predict_elements, IdentificationResult, IsotopeMode};
pub use profile::MeasurementProfile;
pub use spectrum::{build_experiment, Ms2Experiment, Peak, Spectrum};
pub use tolerance::Deviation;
pub use workspace::Workspace;

/// Simulate the theoretical isotope pattern of `formula` observed under `ion_type`, as a
/// [`Spectrum`] with one peak per isotope offset.
pub fn simulate_isotope_pattern(formula: &MolecularFormula, ion_type: &PrecursorIonType) -> Spectrum {
    isotope::simulate_isotope_pattern_spectrum(formula, ion_type)
}

/// Build a [`Spectrum`] from parallel m/z and intensity arrays.
pub fn wrap_spectrum(mz_values: &[f64], intensities: &[f64]) -> Spectrum {
    Spectrum::wrap(mz_values, intensities)
}
