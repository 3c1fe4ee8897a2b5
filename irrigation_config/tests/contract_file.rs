use irrigation_config::load_feature_contract;
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

#[test]
fn loads_contract_in_file_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rf_dose_features_prod.json");
    fs::write(
        &path,
        r#"{
  "features": [
    "soil_avg_pre_mean",
    "soil_avg_pre_std",
    "temp_at_event",
    "humidity_at_event"
  ]
}"#,
    )
    .unwrap();

    let contract = load_feature_contract(&path).expect("valid contract");
    assert_eq!(
        contract.features,
        vec![
            "soil_avg_pre_mean",
            "soil_avg_pre_std",
            "temp_at_event",
            "humidity_at_event"
        ]
    );
}

#[rstest]
#[case(r#"{"features": []}"#, "no features")]
#[case(r#"{"features": ["a", ""]}"#, "empty feature name")]
#[case(r#"{"features": ["a", "a"]}"#, "more than once")]
#[case(r#"{"names": ["a"]}"#, "parse feature contract")]
#[case(r#"not json"#, "parse feature contract")]
fn rejects_bad_contracts(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("contract.json");
    fs::write(&path, body).unwrap();

    let err = load_feature_contract(&path).expect_err("contract should be rejected");
    let msg = format!("{err}");
    assert!(msg.contains(needle), "unexpected error: {msg}");
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = load_feature_contract(&path).expect_err("missing file");
    assert!(format!("{err}").contains("absent.json"));
}
