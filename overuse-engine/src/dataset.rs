//! Training rows built from the same extraction the live analysis uses.

use std::io::Write;

use chrono::NaiveDateTime;
use overuse_core::{AnalysisError, Patient, RiskTier};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::classifier::heuristic_tier;
use crate::features::{extract_features, PatientFeatures, FEATURE_COLUMNS};

/// One patient's row: features, heuristic label and the text columns the
/// trainer drops before fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub patient_id: u64,
    pub features: PatientFeatures,
    pub label: RiskTier,
}

impl TrainingRow {
    pub fn from_patient(patient: &Patient, reference: NaiveDateTime, window_days: u32) -> Self {
        let features = extract_features(patient, reference, window_days);
        let label = heuristic_tier(features.stats.done);
        Self {
            patient_id: patient.id,
            features,
            label,
        }
    }
}

impl Serialize for TrainingRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let stats = &self.features.stats;
        let mut map = serializer.serialize_map(Some(FEATURE_COLUMNS.len() + 5))?;

        map.serialize_entry("idPaciente", &self.patient_id)?;
        map.serialize_entry("qtd_realizadas", &stats.done)?;
        map.serialize_entry("qtd_agendadas", &stats.scheduled)?;
        map.serialize_entry("qtd_canceladas", &stats.cancelled)?;
        map.serialize_entry("intervaloMedioDias", &stats.mean_gap_days)?;
        map.serialize_entry("periodoTotalDias", &stats.span_days)?;
        map.serialize_entry("gastoTotal", &self.features.spend.amount)?;
        map.serialize_entry("numProcedsRepetidos", &stats.repetitions.count())?;
        map.serialize_entry("label", self.label.label())?;
        map.serialize_entry("dataMin_str", &stats.first_done_label())?;
        map.serialize_entry("dataMax_str", &stats.last_done_label())?;
        map.serialize_entry("procedimentosRepetidos_str", &stats.repetitions.describe())?;
        for (category, count) in stats.categories.iter() {
            map.serialize_entry(&category.column_name(), &count)?;
        }
        map.end()
    }
}

/// Builds one row per patient.
pub fn build_rows(
    patients: &[Patient],
    reference: NaiveDateTime,
    window_days: u32,
) -> Vec<TrainingRow> {
    patients
        .iter()
        .map(|patient| TrainingRow::from_patient(patient, reference, window_days))
        .collect()
}

/// Writes rows as newline-delimited JSON.
pub fn write_ndjson<W: Write>(rows: &[TrainingRow], mut out: W) -> Result<(), AnalysisError> {
    for row in rows {
        serde_json::to_writer(&mut out, row).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use overuse_core::{Appointment, AppointmentStatus, Procedure};
    use serde_json::Value;

    fn patient() -> Patient {
        let appointments = (1..=4)
            .map(|day| Appointment {
                id: day,
                date_time: format!("0{day}/03/2024 10:00"),
                status: AppointmentStatus::Done,
                procedure: Procedure {
                    id: day,
                    type_name: "Raspagem de tártaro".into(),
                    description: None,
                    cost: "R$ 50,00".into(),
                },
            })
            .collect();
        Patient {
            id: 11,
            full_name: "Paciente Teste".into(),
            cpf: String::new(),
            birth_date: String::new(),
            email: None,
            phone: None,
            address: None,
            plan: None,
            company: None,
            declared_appointments: 4,
            total_spend: "R$ 200,00".into(),
            appointments,
        }
    }

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn row_carries_heuristic_label_and_text_columns() {
        let row = TrainingRow::from_patient(&patient(), reference(), 365);
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["label"], "Uso Moderado");
        assert_eq!(value["qtd_realizadas"], 4);
        assert_eq!(value["numProcedsRepetidos"], 1);
        assert_eq!(value["dataMin_str"], "01/03/2024");
        assert_eq!(value["dataMax_str"], "04/03/2024");
        assert_eq!(
            value["procedimentosRepetidos_str"],
            "Raspagem de tártaro (4 vezes)"
        );
        assert_eq!(value["count_Periodontia"], 4);
        assert_eq!(value["gastoTotal"], 200.0);
    }

    #[test]
    fn ndjson_has_one_line_per_patient_with_every_feature_column() {
        let rows = build_rows(&[patient(), patient()], reference(), 365);
        let mut buffer = Vec::new();
        write_ndjson(&rows, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: Value = serde_json::from_str(lines[0]).unwrap();
        for column in FEATURE_COLUMNS {
            assert!(parsed.get(column).is_some(), "missing {column}");
        }
    }

    /// Position of `"key":` in a raw NDJSON line.
    fn key_offset(line: &str, key: &str) -> usize {
        line.find(&format!("\"{key}\":"))
            .unwrap_or_else(|| panic!("missing {key} in {line}"))
    }

    #[test]
    fn ndjson_columns_follow_training_order() {
        let rows = build_rows(&[patient()], reference(), 365);
        let mut buffer = Vec::new();
        write_ndjson(&rows, &mut buffer).unwrap();
        let line = String::from_utf8(buffer).unwrap();

        let mut expected = vec!["idPaciente"];
        expected.extend_from_slice(&FEATURE_COLUMNS[..7]);
        expected.extend([
            "label",
            "dataMin_str",
            "dataMax_str",
            "procedimentosRepetidos_str",
        ]);
        expected.extend_from_slice(&FEATURE_COLUMNS[7..]);

        let offsets: Vec<usize> = expected.iter().map(|key| key_offset(&line, key)).collect();
        for (pair, keys) in offsets.windows(2).zip(expected.windows(2)) {
            assert!(pair[0] < pair[1], "{} must come before {}", keys[0], keys[1]);
        }

        // what the trainer keeps after dropping id, label and text columns
        let kept: Vec<&str> = expected
            .iter()
            .copied()
            .filter(|key| *key != "idPaciente" && *key != "label" && !key.ends_with("_str"))
            .collect();
        assert_eq!(kept, FEATURE_COLUMNS);

        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.as_object().unwrap().len(), expected.len());
    }
}
