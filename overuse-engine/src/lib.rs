//! Dental-plan usage history to `AnalysisRecord`: windowing, aggregation,
//! feature extraction, classification and justification.

use std::sync::Arc;

use chrono::NaiveDateTime;
use overuse_core::{
    AnalysisConfig, AnalysisError, AnalysisRecord, Patient, ANALYSIS_TIMESTAMP_FORMAT,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod aggregate;
pub mod classifier;
pub mod dataset;
pub mod features;
pub mod justification;
pub mod repetition;
pub mod score;
pub mod taxonomy;
pub mod window;

pub use classifier::{load_shared, Classification, ForestModel, RiskClassifier, RiskModel};
pub use features::{extract_features, parse_spend, FeatureVector, PatientFeatures, FEATURE_COLUMNS};

use score::{format_percent, risk_percent, ScoreBasis};

/// A request body: one patient or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PatientPayload {
    Many(Vec<Patient>),
    One(Box<Patient>),
}

impl PatientPayload {
    pub fn into_patients(self) -> Vec<Patient> {
        match self {
            PatientPayload::Many(patients) => patients,
            PatientPayload::One(patient) => vec![*patient],
        }
    }
}

/// A single record when exactly one patient was analyzed, a list otherwise.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AnalysisOutput {
    One(Box<AnalysisRecord>),
    Many(Vec<AnalysisRecord>),
}

impl From<Vec<AnalysisRecord>> for AnalysisOutput {
    fn from(mut records: Vec<AnalysisRecord>) -> Self {
        if records.len() == 1 {
            if let Some(record) = records.pop() {
                return AnalysisOutput::One(Box::new(record));
            }
        }
        AnalysisOutput::Many(records)
    }
}

/// Runs the pipeline against a loaded model. Holds no per-patient state, so
/// one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct Analyzer {
    classifier: RiskClassifier,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(model: Option<Arc<dyn RiskModel>>, config: AnalysisConfig) -> Self {
        Self {
            classifier: RiskClassifier::new(model, config.fallback),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    /// Analyzes one patient against `reference` (normally "now").
    pub fn analyze(
        &self,
        patient: &Patient,
        reference: NaiveDateTime,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let _span = tracing::info_span!("analyze", patient = patient.id).entered();

        let features = extract_features(patient, reference, self.config.window_days);
        tracing::debug!(
            done = features.stats.done,
            unparseable = features.unparseable_dates,
            outside_window = features.outside_window,
            "features extracted"
        );

        let classification = self.classifier.classify(&features.vector)?;
        let basis = match classification.confidence {
            Some(confidence) => ScoreBasis::Confidence(confidence),
            None => ScoreBasis::CompletedVisits(features.stats.done),
        };
        let percent = risk_percent(&classification.tier, basis);
        let justification = justification::justify(
            patient.id,
            &classification.tier,
            &features.stats,
            features.spend.amount,
        );

        Ok(AnalysisRecord {
            patient_id: patient.id,
            patient_name: patient.full_name.clone(),
            risk_tier: classification.tier,
            risk_percent: format_percent(percent),
            justification,
            total_appointments: patient.declared_appointments,
            total_spend: features.spend.amount,
            analyzed_at: reference.format(ANALYSIS_TIMESTAMP_FORMAT).to_string(),
            model_used: classification.model_used,
            confidence: classification.confidence,
        })
    }

    /// Analyzes patients in order; the first fatal error aborts the batch.
    pub fn analyze_batch(
        &self,
        patients: &[Patient],
        reference: NaiveDateTime,
    ) -> Result<Vec<AnalysisRecord>, AnalysisError> {
        patients
            .iter()
            .map(|patient| self.analyze(patient, reference))
            .collect()
    }
}

/// Analyze a JSON string holding one patient or a list of patients.
pub fn analyze_payload_str(
    payload_json: &str,
    analyzer: &Analyzer,
    reference: NaiveDateTime,
) -> Result<AnalysisOutput, AnalysisError> {
    let value: Value =
        serde_json::from_str(payload_json).map_err(|err| AnalysisError::Parse(err.to_string()))?;
    analyze_payload_value(value, analyzer, reference)
}

/// Analyze a `serde_json::Value` holding one patient or a list of patients.
pub fn analyze_payload_value(
    payload: Value,
    analyzer: &Analyzer,
    reference: NaiveDateTime,
) -> Result<AnalysisOutput, AnalysisError> {
    if !payload.is_object() && !payload.is_array() {
        return Err(AnalysisError::InvalidInput(
            "esperado um paciente ou uma lista de pacientes".to_string(),
        ));
    }
    let payload: PatientPayload =
        serde_json::from_value(payload).map_err(|err| AnalysisError::Parse(err.to_string()))?;
    let records = analyzer.analyze_batch(&payload.into_patients(), reference)?;
    Ok(AnalysisOutput::from(records))
}
