//! Attaching a theoretically-consistent MS1 isotope pattern and switching to `IsotopeMode::Score`
//! should raise glucose's overall score relative to the same search with MS1 ignored.

use molident::element::Element;
use molident::formula::MolecularFormula;
use molident::ionization::PrecursorIonType;
use molident::profile::MeasurementProfile;
use molident::spectrum::{Ms2Experiment, Spectrum};
use molident::system::{mz, MassOverCharge};
use molident::{identify, simulate_isotope_pattern, IsotopeMode};

fn glucose() -> MolecularFormula {
    MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)])
}

fn base_experiment(ms1: Option<Spectrum>) -> Ms2Experiment {
    let ms2 = Spectrum::wrap(&[181.07, 163.06, 85.028], &[1.0, 0.6, 0.4]);
    let mut experiment = Ms2Experiment::new("glucose_iso", vec![ms2], MassOverCharge::new::<mz>(181.0707))
        .with_ion_type(PrecursorIonType::protonated());
    if let Some(ms1) = ms1 {
        experiment = experiment.with_ms1(ms1);
    }
    experiment
}

#[test]
fn matching_isotope_pattern_raises_the_overall_score() {
    let ion_type = PrecursorIonType::protonated();
    let theoretical_ms1 = simulate_isotope_pattern(&glucose(), &ion_type);
    let profile = MeasurementProfile::qtof();

    let without_ms1 = base_experiment(None);
    let baseline = identify(&without_ms1, 1, false, IsotopeMode::Omit, None, &profile).unwrap();

    let with_ms1 = base_experiment(Some(theoretical_ms1));
    let scored = identify(&with_ms1, 1, false, IsotopeMode::Score, None, &profile).unwrap();

    assert_eq!(baseline[0].formula, glucose());
    assert_eq!(scored[0].formula, glucose());
    assert!(scored[0].overall_score > baseline[0].overall_score);
}
