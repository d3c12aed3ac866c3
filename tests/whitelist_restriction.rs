//! A caller-supplied whitelist should restrict the ranked output to formulas it names, omitting
//! any that have no feasible tree, without ever returning a formula outside the list.

use molident::element::Element;
use molident::formula::MolecularFormula;
use molident::ionization::PrecursorIonType;
use molident::profile::MeasurementProfile;
use molident::spectrum::{Ms2Experiment, Spectrum};
use molident::system::{mz, MassOverCharge};
use molident::{identify, IsotopeMode};

fn glucose() -> MolecularFormula {
    MolecularFormula::new([(Element::C, 6), (Element::H, 12), (Element::O, 6)])
}

fn unrelated_isomer() -> MolecularFormula {
    MolecularFormula::new([(Element::C, 7), (Element::H, 14), (Element::O, 6)])
}

#[test]
fn restricts_results_to_the_whitelist() {
    let ms2 = Spectrum::wrap(&[181.07, 163.06, 85.028], &[1.0, 0.6, 0.4]);
    let experiment = Ms2Experiment::new("glucose_pos", vec![ms2], MassOverCharge::new::<mz>(181.0707))
        .with_ion_type(PrecursorIonType::protonated());
    let profile = MeasurementProfile::qtof();
    let white_list = vec![glucose(), unrelated_isomer()];

    let results = identify(&experiment, 5, false, IsotopeMode::Omit, Some(&white_list), &profile).unwrap();

    assert!(!results.is_empty());
    for result in &results {
        assert!(white_list.contains(&result.formula));
    }
    let mut ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
    ranks.sort_unstable();
    assert_eq!(ranks, (1..=results.len()).collect::<Vec<_>>());
}
