use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use overuse_core::{AnalysisConfig, FallbackPolicy, APPOINTMENT_DATETIME_FORMAT};
use overuse_engine::dataset::{build_rows, write_ndjson};
use overuse_engine::{analyze_payload_str, load_shared, Analyzer, PatientPayload, RiskModel};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "overuse-cli",
    about = "Analisa o histórico de consultas e classifica o risco de uso excessivo do plano."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classifica um paciente ou uma lista de pacientes.
    Analyze {
        /// Arquivo JSON com um paciente ou uma lista de pacientes.
        #[arg(short, long)]
        input: PathBuf,
        /// Artefato do modelo treinado.
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Instante de referência no formato "DD/MM/AAAA HH:MM". Padrão: agora.
        #[arg(short, long)]
        reference: Option<String>,
        /// Config JSON (`window_days`, `fallback`).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Sobrescreve a janela da config.
        #[arg(long)]
        window_days: Option<u32>,
        /// Usa a heurística por contagem quando não houver modelo.
        #[arg(long)]
        allow_heuristic: bool,
        #[arg(long)]
        pretty: bool,
    },
    /// Gera as linhas de treino em NDJSON.
    Dataset {
        #[arg(short, long)]
        input: PathBuf,
        /// Arquivo de saída; stdout quando omitido.
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        reference: Option<String>,
        #[arg(long)]
        window_days: Option<u32>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Analyze {
            input,
            model,
            reference,
            config,
            window_days,
            allow_heuristic,
            pretty,
        } => {
            let mut config = match config {
                Some(path) => read_config(&path)?,
                None => AnalysisConfig::default(),
            };
            if let Some(days) = window_days {
                config.window_days = days;
            }
            if allow_heuristic {
                config.fallback = FallbackPolicy::Heuristic;
            }
            analyze(&input, model.as_deref(), reference.as_deref(), config, pretty)
        }
        Command::Dataset {
            input,
            output,
            reference,
            window_days,
        } => dataset(
            &input,
            output.as_deref(),
            reference.as_deref(),
            window_days.unwrap_or(AnalysisConfig::default().window_days),
        ),
    }
}

fn analyze(
    input: &Path,
    model_path: Option<&Path>,
    reference: Option<&str>,
    config: AnalysisConfig,
    pretty: bool,
) -> anyhow::Result<()> {
    let reference = parse_reference(reference)?;
    let model: Option<Arc<dyn RiskModel>> = match model_path {
        Some(path) => match load_shared(path) {
            Ok(model) => Some(model as Arc<dyn RiskModel>),
            Err(err) if config.fallback == FallbackPolicy::Heuristic => {
                tracing::warn!(error = %err, "model not loaded, falling back to heuristic");
                None
            }
            Err(err) => return Err(err).context("Não foi possível carregar o modelo"),
        },
        None => None,
    };

    let data = std::fs::read_to_string(input)
        .with_context(|| format!("Não foi possível ler o arquivo {input:?}"))?;
    let analyzer = Analyzer::new(model, config);
    tracing::info!(
        model = analyzer.classifier().has_model(),
        window_days = analyzer.config().window_days,
        "analyzing patients"
    );
    let output = analyze_payload_str(&data, &analyzer, reference)?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{rendered}");
    Ok(())
}

fn dataset(
    input: &Path,
    output: Option<&Path>,
    reference: Option<&str>,
    window_days: u32,
) -> anyhow::Result<()> {
    let reference = parse_reference(reference)?;
    let data = std::fs::read_to_string(input)
        .with_context(|| format!("Não foi possível ler o arquivo {input:?}"))?;
    let payload: PatientPayload =
        serde_json::from_str(&data).context("JSON de pacientes inválido")?;
    let rows = build_rows(&payload.into_patients(), reference, window_days);

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Não foi possível criar {path:?}"))?;
            write_ndjson(&rows, BufWriter::new(file))?;
        }
        None => write_ndjson(&rows, io::stdout().lock())?,
    }
    tracing::info!(rows = rows.len(), "dataset written");
    Ok(())
}

fn read_config(path: &Path) -> anyhow::Result<AnalysisConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Não foi possível ler a config {path:?}"))?;
    serde_json::from_str(&data).with_context(|| format!("Config inválida em {path:?}"))
}

fn parse_reference(raw: Option<&str>) -> anyhow::Result<NaiveDateTime> {
    match raw {
        Some(raw) => NaiveDateTime::parse_from_str(raw, APPOINTMENT_DATETIME_FORMAT)
            .with_context(|| format!("Data de referência inválida: {raw:?}")),
        None => Ok(Local::now().naive_local()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn reference_uses_appointment_format() {
        let parsed = parse_reference(Some("01/06/2024 08:00")).unwrap();
        assert_eq!(parsed.to_string(), "2024-06-01 08:00:00");
        assert!(parse_reference(Some("2024-06-01")).is_err());
    }
}
