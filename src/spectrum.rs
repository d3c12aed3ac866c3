//! Spectra, peaks, and the immutable experiment description the pipeline operates on.
use serde::{Deserialize, Serialize};

use crate::formula::MolecularFormula;
use crate::ionization::PrecursorIonType;
use crate::profile::MeasurementProfile;
use crate::system::{mz, Mass, MassOverCharge};

/// A single observed signal: an m/z and a non-negative, scale-free intensity.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Peak {
    mz: MassOverCharge,
    intensity: f64,
}

impl Peak {
    /// Construct a peak. Negative intensities are clamped to zero.
    pub fn new(mz_value: MassOverCharge, intensity: f64) -> Self {
        Self {
            mz: mz_value,
            intensity: intensity.max(0.0),
        }
    }

    /// The observed mass-over-charge.
    pub const fn mz(&self) -> MassOverCharge {
        self.mz
    }

    /// The (possibly unnormalized) intensity.
    pub const fn intensity(&self) -> f64 {
        self.intensity
    }
}

/// An ordered list of [`Peak`]s making up one spectrum.
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Spectrum {
    peaks: Vec<Peak>,
}

impl Spectrum {
    /// An empty spectrum.
    pub fn empty() -> Self {
        Self { peaks: Vec::new() }
    }

    /// Build a spectrum from parallel m/z and intensity arrays, sorted by ascending m/z.
    pub fn wrap(mz_values: &[f64], intensities: &[f64]) -> Self {
        let mut peaks: Vec<Peak> = mz_values
            .iter()
            .zip(intensities)
            .map(|(&m, &i)| Peak::new(MassOverCharge::new::<mz>(m), i))
            .collect();
        peaks.sort_by(|a, b| a.mz.value.total_cmp(&b.mz.value));
        Self { peaks }
    }

    /// Build a spectrum directly from already-constructed peaks, sorted by ascending m/z.
    pub fn from_peaks(mut peaks: Vec<Peak>) -> Self {
        peaks.sort_by(|a, b| a.mz.value.total_cmp(&b.mz.value));
        Self { peaks }
    }

    /// The peaks, in ascending m/z order.
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// `true` iff this spectrum has no peaks.
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// The summed intensity of all peaks, used as the normalization denominator.
    pub fn total_intensity(&self) -> f64 {
        self.peaks.iter().map(Peak::intensity).sum()
    }

    /// The intensity of the most intense peak, used as the alternate normalization denominator.
    pub fn base_peak_intensity(&self) -> f64 {
        self.peaks.iter().map(Peak::intensity).fold(0.0, f64::max)
    }

    /// A copy of this spectrum with intensities scaled so they sum to 1 (a no-op on an empty
    /// spectrum or one whose total intensity is zero).
    #[must_use]
    pub fn normalized_by_sum(&self) -> Self {
        let total = self.total_intensity();
        if total <= 0.0 {
            return self.clone();
        }
        Self {
            peaks: self
                .peaks
                .iter()
                .map(|p| Peak::new(p.mz, p.intensity / total))
                .collect(),
        }
    }

    /// A copy of this spectrum with intensities scaled relative to the base peak.
    #[must_use]
    pub fn normalized_by_base_peak(&self) -> Self {
        let base = self.base_peak_intensity();
        if base <= 0.0 {
            return self.clone();
        }
        Self {
            peaks: self
                .peaks
                .iter()
                .map(|p| Peak::new(p.mz, p.intensity / base))
                .collect(),
        }
    }
}

/// One compound's worth of measurement: an optional MS1 precursor spectrum, one or more MS2
/// (fragmentation) spectra, and the metadata needed to interpret them. Immutable once built.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Ms2Experiment {
    name: String,
    ms1: Option<Spectrum>,
    ms2: Vec<Spectrum>,
    ion_mass: MassOverCharge,
    ion_type: Option<PrecursorIonType>,
    known_formula: Option<MolecularFormula>,
    profile_override: Option<MeasurementProfile>,
}

impl Ms2Experiment {
    /// Build an experiment. `ion_mass` of zero signals "derive the precursor mass from MS1";
    /// `ion_type = None` signals "unknown ionization".
    pub fn new(name: impl Into<String>, ms2: Vec<Spectrum>, ion_mass: MassOverCharge) -> Self {
        Self {
            name: name.into(),
            ms1: None,
            ms2,
            ion_mass,
            ion_type: None,
            known_formula: None,
            profile_override: None,
        }
    }

    /// Attach an MS1 precursor spectrum.
    #[must_use]
    pub fn with_ms1(mut self, ms1: Spectrum) -> Self {
        self.ms1 = Some(ms1);
        self
    }

    /// Replace the MS2 spectra, preserving every other field. Used by recalibration to rebuild
    /// the experiment against mass-corrected peaks.
    #[must_use]
    pub fn with_ms2(mut self, ms2: Vec<Spectrum>) -> Self {
        self.ms2 = ms2;
        self
    }

    /// Attach a known precursor ion type.
    #[must_use]
    pub fn with_ion_type(mut self, ion_type: PrecursorIonType) -> Self {
        self.ion_type = Some(ion_type);
        self
    }

    /// Attach a ground-truth neutral formula, for evaluation purposes.
    #[must_use]
    pub fn with_known_formula(mut self, formula: MolecularFormula) -> Self {
        self.known_formula = Some(formula);
        self
    }

    /// Override the measurement profile for this one experiment.
    #[must_use]
    pub fn with_profile_override(mut self, profile: MeasurementProfile) -> Self {
        self.profile_override = Some(profile);
        self
    }

    /// Replace the precursor ion m/z, preserving every other field. Used once the pipeline has
    /// derived a precursor mass from MS1.
    #[must_use]
    pub fn with_ion_mass(mut self, ion_mass: MassOverCharge) -> Self {
        self.ion_mass = ion_mass;
        self
    }

    /// A caller-assigned identifier, used in workspace paths and error contexts.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The optional MS1 (precursor isotope pattern) spectrum.
    pub fn ms1(&self) -> Option<&Spectrum> {
        self.ms1.as_ref()
    }

    /// The MS2 (fragmentation) spectra.
    pub fn ms2(&self) -> &[Spectrum] {
        &self.ms2
    }

    /// The precursor ion m/z, or 0 if it must be derived from MS1.
    pub const fn ion_mass(&self) -> MassOverCharge {
        self.ion_mass
    }

    /// Whether the precursor mass is unknown and must be derived from MS1.
    pub fn needs_precursor_mass(&self) -> bool {
        self.ion_mass.value == 0.0
    }

    /// The declared precursor ion type, if known.
    pub fn ion_type(&self) -> Option<&PrecursorIonType> {
        self.ion_type.as_ref()
    }

    /// The ground-truth formula, if supplied.
    pub fn known_formula(&self) -> Option<&MolecularFormula> {
        self.known_formula.as_ref()
    }

    /// The per-experiment profile override, if any.
    pub fn profile_override(&self) -> Option<&MeasurementProfile> {
        self.profile_override.as_ref()
    }

    /// The precursor mass, interpreted as a [`Mass`] rather than an `m/z` (valid once the charge
    /// magnitude is known to be 1, per this crate's single-charge scope).
    pub fn ion_mass_as_mass(&self) -> Mass {
        Mass::new::<crate::system::dalton>(self.ion_mass.value)
    }
}

/// Assemble an [`Ms2Experiment`] from raw arrays: parallel `(mz, intensity)` pairs for an
/// optional MS1 spectrum, a list of such pairs for one or more MS2 spectra, and the precursor ion
/// m/z (0 to request MS1-derivation). A convenience wrapper for callers who don't already hold
/// [`Spectrum`] values.
pub fn build_experiment(
    name: impl Into<String>,
    ms1: Option<(&[f64], &[f64])>,
    ms2: &[(&[f64], &[f64])],
    ion_mass: f64,
) -> Ms2Experiment {
    let mut experiment = Ms2Experiment::new(
        name,
        ms2.iter().map(|(mzs, intensities)| Spectrum::wrap(mzs, intensities)).collect(),
        MassOverCharge::new::<mz>(ion_mass),
    );
    if let Some((mzs, intensities)) = ms1 {
        experiment = experiment.with_ms1(Spectrum::wrap(mzs, intensities));
    }
    experiment
}
