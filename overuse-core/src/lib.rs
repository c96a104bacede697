//! Tipos compartilhados da análise de uso do plano odontológico.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Formato de data/hora das consultas recebidas (`DD/MM/YYYY HH:MM`).
pub const APPOINTMENT_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";
/// Formato usado nas datas das justificativas.
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";
/// Formato do carimbo `dataAnalise`.
pub const ANALYSIS_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Janela padrão (dias) considerada na análise.
pub const DEFAULT_WINDOW_DAYS: u32 = 365;

/// Configuração da análise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Quantos dias antes da data de referência uma consulta ainda conta.
    pub window_days: u32,
    /// O que fazer quando não há modelo treinado disponível.
    pub fallback: FallbackPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            fallback: FallbackPolicy::RequireModel,
        }
    }
}

/// Política quando o classificador treinado não está carregado.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Sem modelo a análise falha (uso em produção).
    #[default]
    RequireModel,
    /// Usa a heurística por contagem de consultas (rotulagem offline).
    Heuristic,
}

/// Situação de uma consulta. Enum aberto: valores desconhecidos são preservados.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AppointmentStatus {
    Done,
    Scheduled,
    Cancelled,
    Other(String),
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AppointmentStatus::Done => "Realizada",
            AppointmentStatus::Scheduled => "Agendada",
            AppointmentStatus::Cancelled => "Cancelada",
            AppointmentStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for AppointmentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Realizada" => AppointmentStatus::Done,
            "Agendada" => AppointmentStatus::Scheduled,
            "Cancelada" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Other(raw),
        }
    }
}

impl From<&str> for AppointmentStatus {
    fn from(raw: &str) -> Self {
        AppointmentStatus::from(raw.to_string())
    }
}

impl From<AppointmentStatus> for String {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Procedimento executado em uma consulta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Procedure {
    #[serde(rename = "idProcedimento", alias = "id")]
    pub id: u64,
    #[serde(rename = "tipoProcedimento", alias = "typeName", default)]
    pub type_name: String,
    #[serde(rename = "descricao", alias = "description", default)]
    pub description: Option<String>,
    /// Valor monetário no formato `R$ 1.234,56`.
    #[serde(rename = "custo", alias = "cost", default)]
    pub cost: String,
}

/// Uma consulta do histórico do paciente.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    #[serde(rename = "idConsulta", alias = "id")]
    pub id: u64,
    /// Data/hora em `DD/MM/YYYY HH:MM`; pode vir malformada.
    #[serde(rename = "dataConsulta", alias = "dateTime")]
    pub date_time: String,
    pub status: AppointmentStatus,
    #[serde(rename = "procedimento", alias = "procedure")]
    pub procedure: Procedure,
}

impl Appointment {
    /// Interpreta `date_time`; `None` quando o texto não segue o formato.
    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.date_time, APPOINTMENT_DATETIME_FORMAT).ok()
    }

    pub fn is_done(&self) -> bool {
        self.status == AppointmentStatus::Done
    }
}

/// Paciente com o histórico de consultas a analisar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    #[serde(rename = "idPaciente", alias = "id")]
    pub id: u64,
    #[serde(rename = "nomeCompleto", alias = "fullName", default)]
    pub full_name: String,
    #[serde(default)]
    pub cpf: String,
    #[serde(rename = "dataNascimento", alias = "birthDate", default)]
    pub birth_date: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "telefone", alias = "phone", default)]
    pub phone: Option<String>,
    #[serde(rename = "endereco", alias = "address", default)]
    pub address: Option<String>,
    #[serde(rename = "planoOdontologico", alias = "plan", default)]
    pub plan: Option<String>,
    #[serde(rename = "empresa", alias = "company", default)]
    pub company: Option<String>,
    /// Quantidade de consultas declarada pelo chamador.
    #[serde(rename = "numConsultas", alias = "declaredAppointmentCount", default)]
    pub declared_appointments: u32,
    /// Gasto total já agregado pelo chamador (não é recalculado).
    #[serde(rename = "gastoTotal", alias = "totalSpend", default)]
    pub total_spend: String,
    #[serde(rename = "consultas", alias = "appointments", default)]
    pub appointments: Vec<Appointment>,
}

/// Grau de risco de uso do plano.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskTier {
    NoRisk,
    ModerateUse,
    ModerateUseTrendingExcessive,
    ExcessiveUse,
    /// Rótulo fora da taxonomia (modelo desatualizado).
    Unrecognized(String),
}

impl RiskTier {
    /// Graus conhecidos, do menor para o maior.
    pub const KNOWN: [RiskTier; 4] = [
        RiskTier::NoRisk,
        RiskTier::ModerateUse,
        RiskTier::ModerateUseTrendingExcessive,
        RiskTier::ExcessiveUse,
    ];

    pub fn label(&self) -> &str {
        match self {
            RiskTier::NoRisk => "NenhumRisco",
            RiskTier::ModerateUse => "Uso Moderado",
            RiskTier::ModerateUseTrendingExcessive => "Uso Moderado com Tendência a Excesso",
            RiskTier::ExcessiveUse => "UsoExcessivo",
            RiskTier::Unrecognized(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, RiskTier::Unrecognized(_))
    }
}

impl From<&str> for RiskTier {
    fn from(label: &str) -> Self {
        match label {
            "NenhumRisco" => RiskTier::NoRisk,
            "Uso Moderado" => RiskTier::ModerateUse,
            "Uso Moderado com Tendência a Excesso" => RiskTier::ModerateUseTrendingExcessive,
            "UsoExcessivo" => RiskTier::ExcessiveUse,
            other => RiskTier::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for RiskTier {
    fn from(label: String) -> Self {
        RiskTier::from(label.as_str())
    }
}

impl From<RiskTier> for String {
    fn from(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Unrecognized(raw) => raw,
            known => known.label().to_string(),
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Resultado final da análise de um paciente.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord {
    #[serde(rename = "idPaciente")]
    pub patient_id: u64,
    #[serde(rename = "nomePaciente")]
    pub patient_name: String,
    #[serde(rename = "tipoAlerta")]
    pub risk_tier: RiskTier,
    /// Percentual no formato `"42%"`.
    #[serde(rename = "grauRisco")]
    pub risk_percent: String,
    #[serde(rename = "justificativa")]
    pub justification: String,
    #[serde(rename = "totalConsultas")]
    pub total_appointments: u32,
    #[serde(rename = "gastoTotal")]
    pub total_spend: f64,
    #[serde(rename = "dataAnalise")]
    pub analyzed_at: String,
    #[serde(rename = "modelo_utilizado")]
    pub model_used: bool,
    /// Ausente quando a heurística produziu o rótulo.
    #[serde(rename = "confiança", alias = "confianca")]
    pub confidence: Option<f64>,
}

/// Erros da análise de risco.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("{0}")]
    ModelUnavailable(String),
    #[error("Artefato do modelo inválido: {0}")]
    ModelArtifact(String),
    #[error("Colunas do modelo divergem do contrato: esperado {expected:?}, recebido {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Falha na inferência: {0}")]
    Inference(String),
    #[error("Não foi possível ler os dados: {0}")]
    Parse(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    #[error("Falha de E/S: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Mensagem padrão quando a análise exige o modelo e ele não foi carregado.
    pub fn model_missing() -> Self {
        AnalysisError::ModelUnavailable(
            "Modelo não carregado. A análise não pode ser realizada sem o modelo treinado."
                .to_string(),
        )
    }
}
