//! Charge-carrying adjustments between a neutral molecule and the ion an instrument measures.
//!
//! Grounded in the charge-carrier composition idiom of `rustyms::molecular_charge`, but
//! specialised to the small, closed set of adjustments relevant to small-molecule MS (a single
//! charge carrier formula plus an optional in-source modification) rather than a combinatorial
//! peptide charge-carrier selection.
use serde::{Deserialize, Serialize};

use crate::element::Element;
use crate::error::{Context, ErrorKind, IdentificationError};
use crate::formula::MolecularFormula;
use crate::system::{Charge, Mass};

/// Charge plus the small-mass adjustment that produced it (protonation, deprotonation, a metal
/// adduct, ...).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Hash)]
pub struct Ionization {
    charge: i8,
    adjustment: MolecularFormula,
}

impl Ionization {
    /// Build an ionization from an explicit charge and mass adjustment formula. `adjustment` is
    /// added to (for positive charge) or subtracted from (for negative charge) the neutral
    /// formula to reach the ion's elemental composition; charge-carrier electrons are accounted
    /// for separately via [`Ionization::charge`].
    pub fn new(charge: i8, adjustment: MolecularFormula) -> Self {
        Self { charge, adjustment }
    }

    /// `[M+H]+`: protonation.
    pub fn protonated() -> Self {
        Self::new(1, MolecularFormula::new([(Element::H, 1)]))
    }

    /// `[M-H]-`: deprotonation.
    pub fn deprotonated() -> Self {
        Self::new(-1, MolecularFormula::new([(Element::H, 1)]))
    }

    /// `[M+Na]+`: sodium adduct.
    pub fn sodiated() -> Self {
        Self::new(1, MolecularFormula::new([(Element::Na, 1)]))
    }

    /// `[M]+`/`[M]-`: radical ion, no atoms added or removed.
    pub fn radical(charge: i8) -> Self {
        Self::new(charge, MolecularFormula::empty())
    }

    /// The net charge (±1 in this crate's supported range; multiply-charged precursors are out
    /// of scope).
    pub const fn charge(&self) -> i8 {
        self.charge
    }

    /// The elemental adjustment relative to the neutral molecule.
    pub fn adjustment(&self) -> &MolecularFormula {
        &self.adjustment
    }

    /// The mass contributed by this ionization alone: the adjustment's mass, signed by charge
    /// direction, minus one electron mass per unit of charge (an electron is lost per positive
    /// charge, gained per negative charge).
    fn mass_delta(&self) -> Mass {
        let adjustment_mass = self.adjustment.monoisotopic_mass();
        let signed_adjustment = if self.charge >= 0 {
            adjustment_mass
        } else {
            -adjustment_mass
        };
        let electron_mass = Element::Electron.monoisotopic_mass();
        signed_adjustment - electron_mass * f64::from(self.charge)
    }
}

/// An [`Ionization`] plus an in-source modification (an additional adduct atom gain, or a
/// neutral loss that occurred before the ion reached the detector).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Hash)]
pub struct PrecursorIonType {
    ionization: Ionization,
    in_source_modification: MolecularFormula,
    /// `true` if the modification is a loss (subtracted) rather than a gain (added).
    is_loss: bool,
}

impl PrecursorIonType {
    /// Wrap an [`Ionization`] with no further in-source modification.
    pub fn from_ionization(ionization: Ionization) -> Self {
        Self {
            ionization,
            in_source_modification: MolecularFormula::empty(),
            is_loss: false,
        }
    }

    /// Attach an in-source gain (e.g. an additional adduct atom) to this ion type.
    #[must_use]
    pub fn with_gain(mut self, gain: MolecularFormula) -> Self {
        self.in_source_modification = gain;
        self.is_loss = false;
        self
    }

    /// Attach an in-source loss (e.g. dehydration before detection) to this ion type.
    #[must_use]
    pub fn with_loss(mut self, loss: MolecularFormula) -> Self {
        self.in_source_modification = loss;
        self.is_loss = true;
        self
    }

    /// `[M+H]+` with no in-source modification.
    pub fn protonated() -> Self {
        Self::from_ionization(Ionization::protonated())
    }

    /// `[M-H]-` with no in-source modification.
    pub fn deprotonated() -> Self {
        Self::from_ionization(Ionization::deprotonated())
    }

    /// The underlying charge-carrying ionization.
    pub const fn ionization(&self) -> &Ionization {
        &self.ionization
    }

    /// The net charge of ions of this type.
    pub fn charge(&self) -> Charge {
        Charge::new::<crate::system::e>(self.ionization.charge as f64)
    }

    /// The mass of the ion produced by a given neutral formula `f`.
    pub fn neutral_to_ion_mass(&self, f: &MolecularFormula) -> Mass {
        let modification_mass = self.in_source_modification.monoisotopic_mass();
        let signed_modification = if self.is_loss {
            -modification_mass
        } else {
            modification_mass
        };
        f.monoisotopic_mass() + self.ionization.mass_delta() + signed_modification
    }

    /// The neutral mass a given observed ion mass `m` corresponds to. Inverse of
    /// [`PrecursorIonType::neutral_to_ion_mass`] up to floating-point rounding (within 1e-9).
    pub fn ion_to_neutral_mass(&self, m: Mass) -> Mass {
        let modification_mass = self.in_source_modification.monoisotopic_mass();
        let signed_modification = if self.is_loss {
            -modification_mass
        } else {
            modification_mass
        };
        m - self.ionization.mass_delta() - signed_modification
    }
}

impl std::fmt::Display for PrecursorIonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.ionization.charge() >= 0 { '+' } else { '-' };
        write!(f, "[M{sign}{}]{sign}", self.ionization.adjustment())
    }
}

/// Parse one of the small set of named ion types this crate understands: `"[M+H]+"`,
/// `"[M-H]-"`, `"[M+Na]+"`, `"[M]+"`, `"[M]-"`.
pub fn parse_ionization(name: &str) -> Result<PrecursorIonType, IdentificationError> {
    match name {
        "[M+H]+" => Ok(PrecursorIonType::protonated()),
        "[M-H]-" => Ok(PrecursorIonType::deprotonated()),
        "[M+Na]+" => Ok(PrecursorIonType::from_ionization(Ionization::sodiated())),
        "[M]+" => Ok(PrecursorIonType::from_ionization(Ionization::radical(1))),
        "[M]-" => Ok(PrecursorIonType::from_ionization(Ionization::radical(-1))),
        other => Err(IdentificationError::new(
            ErrorKind::InvalidInput,
            "unrecognised ion type",
            format!("`{other}` is not one of the supported named ion types"),
            Context::field("ionType"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    fn glucose() -> MolecularFormula {
        MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)])
    }

    #[test]
    fn protonation_and_deprotonation_are_inverses_of_neutral_to_ion() {
        let pit = PrecursorIonType::protonated();
        let ion_mass = pit.neutral_to_ion_mass(&glucose());
        let recovered = pit.ion_to_neutral_mass(ion_mass);
        assert!((recovered - glucose().monoisotopic_mass()).value.abs() < 1e-9);
    }

    #[test]
    fn deprotonated_round_trip() {
        let pit = PrecursorIonType::deprotonated();
        let ion_mass = pit.neutral_to_ion_mass(&glucose());
        let recovered = pit.ion_to_neutral_mass(ion_mass);
        assert!((recovered - glucose().monoisotopic_mass()).value.abs() < 1e-9);
    }

    #[test]
    fn protonated_ion_mass_is_roughly_neutral_plus_proton() {
        let pit = PrecursorIonType::protonated();
        let ion_mass = pit.neutral_to_ion_mass(&glucose());
        assert!((ion_mass.value - 181.0707).abs() < 1e-3);
    }

    #[test]
    fn in_source_loss_round_trips() {
        let pit = PrecursorIonType::protonated()
            .with_loss(MolecularFormula::new([(Element::H, 2), (Element::O, 1)]));
        let ion_mass = pit.neutral_to_ion_mass(&glucose());
        let recovered = pit.ion_to_neutral_mass(ion_mass);
        assert!((recovered - glucose().monoisotopic_mass()).value.abs() < 1e-9);
    }
}
