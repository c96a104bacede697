//! Ponte WASM <-> JavaScript para a análise de uso do plano odontológico.
//!
//! `JsAnalyzer` lê o artefato do modelo uma única vez e é reutilizado em
//! todas as chamadas. `analyze_patients` é o atalho de chamada única.

use std::sync::Arc;

use chrono::NaiveDateTime;
use overuse_core::{AnalysisConfig, AnalysisError, FallbackPolicy, APPOINTMENT_DATETIME_FORMAT};
use overuse_engine::{analyze_payload_value, AnalysisOutput, Analyzer, ForestModel, RiskModel};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JsAnalysisConfig {
    #[serde(default)]
    window_days: Option<u32>,
    #[serde(default)]
    allow_heuristic: Option<bool>,
}

impl From<JsAnalysisConfig> for AnalysisConfig {
    fn from(cfg: JsAnalysisConfig) -> Self {
        let mut base = AnalysisConfig::default();
        if let Some(days) = cfg.window_days {
            base.window_days = days;
        }
        if let Some(true) = cfg.allow_heuristic {
            base.fallback = FallbackPolicy::Heuristic;
        }
        base
    }
}

/// Analisador com o modelo já carregado.
#[wasm_bindgen]
pub struct JsAnalyzer {
    analyzer: Analyzer,
}

#[wasm_bindgen]
impl JsAnalyzer {
    /// `model_json` é o conteúdo do artefato do modelo; sem ele a análise só
    /// roda quando `allowHeuristic` estiver ligado.
    #[wasm_bindgen(constructor)]
    pub fn new(model_json: Option<String>, config: Option<JsValue>) -> Result<JsAnalyzer, JsValue> {
        #[cfg(target_arch = "wasm32")]
        console_error_panic_hook::set_once();

        let cfg = match config {
            Some(js_cfg) => {
                let cfg: JsAnalysisConfig = from_value(js_cfg).map_err(|err| {
                    JsValue::from_str(&format!("Não foi possível ler a config: {err}"))
                })?;
                AnalysisConfig::from(cfg)
            }
            None => AnalysisConfig::default(),
        };
        JsAnalyzer::build(model_json.as_deref(), cfg).map_err(format_analysis_error)
    }

    #[wasm_bindgen(getter, js_name = hasModel)]
    pub fn has_model(&self) -> bool {
        self.analyzer.classifier().has_model()
    }

    /// Analisa um paciente ou uma lista de pacientes. `reference` segue o
    /// formato `DD/MM/AAAA HH:MM` das consultas.
    pub fn analyze(&self, input: JsValue, reference: String) -> Result<JsValue, JsValue> {
        let payload = from_value::<serde_json::Value>(input).map_err(|err| {
            JsValue::from_str(&format!("Não foi possível ler o JSON de pacientes: {err}"))
        })?;
        let output = self
            .analyze_value(payload, &reference)
            .map_err(format_analysis_error)?;

        // `confiança` precisa chegar como null, não undefined.
        output
            .serialize(&Serializer::json_compatible())
            .map_err(|err| {
                JsValue::from_str(&format!("Não foi possível serializar a análise: {err}"))
            })
    }
}

impl JsAnalyzer {
    fn build(model_json: Option<&str>, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let model = match model_json {
            Some(raw) => Some(Arc::new(ForestModel::from_json_str(raw)?) as Arc<dyn RiskModel>),
            None => None,
        };
        Ok(Self {
            analyzer: Analyzer::new(model, config),
        })
    }

    fn analyze_value(
        &self,
        payload: serde_json::Value,
        reference: &str,
    ) -> Result<AnalysisOutput, AnalysisError> {
        let reference = NaiveDateTime::parse_from_str(reference, APPOINTMENT_DATETIME_FORMAT)
            .map_err(|err| {
                AnalysisError::InvalidInput(format!("data de referência inválida: {err}"))
            })?;
        analyze_payload_value(payload, &self.analyzer, reference)
    }
}

/// Chamada única: lê o modelo, analisa e descarta. Para várias chamadas use
/// `JsAnalyzer`.
#[wasm_bindgen]
pub fn analyze_patients(
    input: JsValue,
    model_json: Option<String>,
    config: Option<JsValue>,
    reference: String,
) -> Result<JsValue, JsValue> {
    JsAnalyzer::new(model_json, config)?.analyze(input, reference)
}

fn format_analysis_error(err: AnalysisError) -> JsValue {
    JsValue::from_str(&format!("Erro na análise: {err}"))
}
