use irrigation_core::{BuildError, Controller, DoseCfg, FixedEstimator};
use rstest::rstest;

fn fixed(names: &[&str]) -> FixedEstimator {
    FixedEstimator::new(names.iter().map(|s| (*s).to_string()).collect(), 10.0)
}

#[rstest]
fn missing_thresholds_yield_typed_build_error() {
    let err = Controller::builder()
        .try_build()
        .expect_err("should fail with MissingThresholds");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingThresholds) => {}
        other => panic!("expected MissingThresholds, got: {other:?}"),
    }
}

#[rstest]
#[case(480.0, 521.0)]
#[case(500.0, 500.0)]
#[case(f64::NAN, 480.0)]
#[case(521.0, f64::INFINITY)]
fn bad_thresholds_are_rejected(#[case] dry: f64, #[case] wet: f64) {
    let err = Controller::builder()
        .thresholds(dry, wet)
        .try_build()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidThresholds { .. })
    ));
}

#[rstest]
fn empty_allowed_set_is_rejected() {
    let err = Controller::builder()
        .thresholds(521.0, 480.0)
        .dose(DoseCfg {
            allowed_seconds: vec![],
        })
        .try_build()
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[rstest]
#[case(&["soil_avg_at_event", "rainfall_24h"], "rainfall_24h")]
#[case(&["soil_avg_pre_median"], "soil_avg_pre_median")]
fn contract_names_outside_the_window_are_rejected(#[case] names: &[&str], #[case] bad: &str) {
    let err = Controller::builder()
        .thresholds(521.0, 480.0)
        .estimator(fixed(names))
        .try_build()
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<BuildError>(),
        Some(&BuildError::UnknownFeature(bad.to_string()))
    );
}

#[rstest]
fn full_producible_contract_builds() {
    let names = irrigation_core::FeatureVector::producible_names();
    let c = Controller::builder()
        .thresholds(521.0, 480.0)
        .estimator(FixedEstimator::new(names, 10.0))
        .try_build()
        .unwrap();
    assert!(c.planner().has_estimator());
}
