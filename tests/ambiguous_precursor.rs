//! Two equally-plausible MS1 isotope patterns with no declared precursor m/z should surface as an
//! `InvalidInput` error rather than silently picking one.

use molident::error::ErrorKind;
use molident::profile::MeasurementProfile;
use molident::spectrum::{Ms2Experiment, Spectrum};
use molident::system::{mz, MassOverCharge};
use molident::{identify, IsotopeMode};

#[test]
fn two_equally_scoring_ms1_patterns_are_rejected() {
    let ms1 = Spectrum::wrap(
        &[180.063, 181.066, 181.070, 182.073],
        &[1.0, 0.07, 1.0, 0.07],
    );
    let ms2 = Spectrum::wrap(&[100.0], &[1.0]);
    let experiment = Ms2Experiment::new("ambiguous", vec![ms2], MassOverCharge::new::<mz>(0.0)).with_ms1(ms1);
    let profile = MeasurementProfile::qtof();

    let err = identify(&experiment, 5, false, IsotopeMode::Omit, None, &profile).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("parentmass"));
}
