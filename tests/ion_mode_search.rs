//! With an unknown precursor ion type but a declared negative charge, searching across ion modes
//! should favor the deprotonated adduct over a bare radical anion when the fragmentation pattern
//! actually matches deprotonation.

use molident::element::Element;
use molident::formula::MolecularFormula;
use molident::ionization::PrecursorIonType;
use molident::profile::MeasurementProfile;
use molident::spectrum::{Ms2Experiment, Spectrum};
use molident::system::{mz, MassOverCharge};
use molident::{identify_precursor_and_ionization, IsotopeMode};

fn glucose() -> MolecularFormula {
    MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)])
}

#[test]
fn deprotonated_adduct_outranks_radical_anion() {
    let ms2 = Spectrum::wrap(&[179.056, 161.045], &[1.0, 0.6]);
    let experiment = Ms2Experiment::new("deprotonated_glucose", vec![ms2], MassOverCharge::new::<mz>(179.056))
        .with_ion_type(PrecursorIonType::deprotonated());
    let profile = MeasurementProfile::qtof();

    let results = identify_precursor_and_ionization(&experiment, 5, false, IsotopeMode::Omit, &profile).unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].formula, glucose());
    assert_eq!(results[0].ionization, PrecursorIonType::deprotonated());

    if let Some(radical_result) = results.iter().find(|r| r.ionization != PrecursorIonType::deprotonated()) {
        assert!(results[0].overall_score >= radical_result.overall_score);
    }
}
