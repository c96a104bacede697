use std::fs;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use overuse_core::AnalysisConfig;
use overuse_engine::{analyze_payload_str, Analyzer, ForestModel};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn reference() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

#[test]
fn patient_batch_matches_golden() {
    let model = ForestModel::load(fixture_path("forest_model.json")).expect("modelo de teste");
    let analyzer = Analyzer::new(Some(Arc::new(model)), AnalysisConfig::default());

    let payload = fs::read_to_string(fixture_path("patients.json")).expect("pacientes de teste");
    let output = analyze_payload_str(&payload, &analyzer, reference()).expect("análise");
    let actual = serde_json::to_value(output).expect("serializar análise");

    let expected = fs::read_to_string(fixture_path("patients_analysis.json"))
        .expect("golden da análise");
    let expected: Value = serde_json::from_str(&expected).expect("golden inválido");

    assert_eq!(actual, expected);
}
