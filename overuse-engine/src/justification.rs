//! Natural-language justification for an assigned risk tier.

use overuse_core::RiskTier;
use sha2::{Digest, Sha256};

use crate::aggregate::VisitStats;

/// Replaces the repetition summary in templates when nothing repeats.
pub const NO_REPETITION_PHRASE: &str = "nenhuma repetição de procedimentos";

const SINGLE_VISIT: &str = "Após análise dos dados entre {inicio} e {fim}, constatei que o paciente realizou apenas uma consulta odontológica, totalizando um gasto de R$ {gasto}. Como há apenas esse registro, não é possível calcular intervalos nem identificar repetições de procedimentos. Portanto, com base nos dados disponíveis, concluo que o paciente não apresenta nenhum risco.";

static NO_RISK: [&str; 4] = [
    "Após análise dos registros entre {inicio} e {fim}, observei que o paciente realizou {consultas} consultas, com um gasto total de R$ {gasto} e intervalos médios de {intervalo} dias. Como não foram detectadas repetições nos procedimentos, o padrão de uso se mostra totalmente adequado.",
    "Conforme avaliação dos dados entre {inicio} e {fim}, constata-se que o paciente teve {consultas} consultas, totalizando R$ {gasto} em gastos, com intervalos de {intervalo} dias entre as visitas. A ausência de repetições evidencia um comportamento de uso seguro.",
    "Examinando os atendimentos realizados entre {inicio} e {fim}, verifiquei que o paciente efetuou {consultas} consultas, com um gasto acumulado de R$ {gasto} e uma média de {intervalo} dias entre elas. Não foram observadas repetições, o que indica um uso normal dos serviços.",
    "Entre {inicio} e {fim}, o paciente realizou {consultas} consultas, com um gasto total de R$ {gasto} e intervalos de {intervalo} dias, sem que se identifiquem repetições de procedimentos – evidenciando um padrão de uso dentro dos limites esperados.",
];

static MODERATE: [&str; 4] = [
    "Após avaliação dos dados entre {inicio} e {fim}, constatei que o paciente realizou {consultas} consultas, com um gasto total de R$ {gasto} e uma média de {intervalo} dias entre atendimentos. Foram observadas algumas repetições ({repeticoes}), mas elas permanecem dentro dos limites aceitáveis, configurando um uso moderado dos serviços.",
    "Conforme os registros entre {inicio} e {fim}, o paciente realizou {consultas} consultas, totalizando um gasto de R$ {gasto} e intervalos médios de {intervalo} dias. {repeticoes} foram identificadas de forma isolada, o que é compatível com um padrão moderado de utilização.",
    "Ao analisar os atendimentos entre {inicio} e {fim}, verifiquei que o paciente teve {consultas} consultas com um gasto acumulado de R$ {gasto} e intervalos de {intervalo} dias. Embora haja repetições, como ({repeticoes}), elas não ultrapassam os limites normais, indicando um uso moderado.",
    "Entre {inicio} e {fim}, foram registradas {consultas} consultas, com um gasto total de R$ {gasto} e uma média de {intervalo} dias entre atendimentos. As repetições observadas ({repeticoes}) sugerem um uso moderado, sem que haja sinais de abuso.",
];

static TRENDING: [&str; 4] = [
    "Após análise dos registros entre {inicio} e {fim}, observei que o paciente realizou {consultas} consultas, com um gasto total de R$ {gasto} e intervalos médios de {intervalo} dias. Foram identificadas repetições frequentes, tais como ({repeticoes}), o que pode indicar uma tendência ao aumento do uso a longo prazo. Recomendo monitoramento contínuo para evitar futuros desequilíbrios.",
    "Conforme os dados entre {inicio} e {fim}, o paciente teve {consultas} consultas, acumulando um gasto de R$ {gasto} e mantendo intervalos de {intervalo} dias. A repetição frequente de procedimentos, como ({repeticoes}), sugere que o uso do convênio está se intensificando – um sinal de que é prudente acompanhar esse padrão de perto.",
    "Ao avaliar os registros entre {inicio} e {fim}, verifiquei que o paciente realizou {consultas} consultas, totalizando R$ {gasto} em gastos, com uma média de {intervalo} dias entre atendimentos. A ocorrência de repetições ({repeticoes}) evidencia uma tendência que pode se intensificar, sugerindo a necessidade de um monitoramento regular para prevenir abusos futuros.",
    "Entre as datas {inicio} e {fim}, o paciente realizou {consultas} consultas com um gasto total de R$ {gasto} e intervalos médios de {intervalo} dias. A identificação de repetições, como ({repeticoes}), indica que há uma inclinação para um uso maior dos serviços, recomendando uma análise mais atenta do histórico.",
];

static EXCESSIVE: [&str; 4] = [
    "Após analisar os registros entre {inicio} e {fim}, constatei que o paciente realizou {consultas} consultas com intervalos extremamente curtos (média de {intervalo} dias) e um gasto total de R$ {gasto}. A presença consistente de repetições, como ({repeticoes}), evidencia um uso excessivo dos serviços odontológicos, o que requer atenção imediata para evitar complicações a longo prazo.",
    "Conforme os dados coletados entre {inicio} e {fim}, o paciente realizou {consultas} consultas, totalizando um gasto de R$ {gasto} e mantendo intervalos de apenas {intervalo} dias entre atendimentos. A alta frequência de repetições ({repeticoes}) confirma um padrão de uso excessivo, sugerindo a necessidade de intervenção urgente.",
    "Ao examinar os registros entre {inicio} e {fim}, observei que o paciente teve {consultas} consultas com um gasto acumulado de R$ {gasto} e intervalos médios de {intervalo} dias. A ocorrência expressiva de repetições, exemplificada por ({repeticoes}), caracteriza claramente um uso excessivo dos serviços, indicando um risco elevado que demanda ação imediata.",
    "Entre {inicio} e {fim}, o paciente registrou {consultas} consultas com intervalos muito curtos (média de {intervalo} dias) e um gasto total de R$ {gasto}. A elevada ocorrência de repetições, tais como ({repeticoes}), evidencia um padrão preocupante de uso excessivo, recomendando uma avaliação detalhada para prevenir complicações futuras.",
];

fn templates_for(tier: &RiskTier) -> Option<&'static [&'static str]> {
    match tier {
        RiskTier::NoRisk => Some(&NO_RISK[..]),
        RiskTier::ModerateUse => Some(&MODERATE[..]),
        RiskTier::ModerateUseTrendingExcessive => Some(&TRENDING[..]),
        RiskTier::ExcessiveUse => Some(&EXCESSIVE[..]),
        RiskTier::Unrecognized(_) => None,
    }
}

/// Stable template choice: SHA-256 of the decimal patient id, first 8 bytes
/// big-endian, modulo `count`.
pub fn template_index(patient_id: u64, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let digest = Sha256::digest(patient_id.to_string().as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % count as u64) as usize
}

/// Builds the justification text for a patient.
pub fn justify(patient_id: u64, tier: &RiskTier, stats: &VisitStats, spend: f64) -> String {
    let inicio = stats.first_done_label();
    let fim = stats.last_done_label();
    let gasto = format!("{spend:.2}");

    if stats.done == 1 {
        return SINGLE_VISIT
            .replace("{inicio}", &inicio)
            .replace("{fim}", &fim)
            .replace("{gasto}", &gasto);
    }

    let Some(templates) = templates_for(tier) else {
        tracing::warn!(patient = patient_id, tier = %tier, "no justification template for tier");
        return format!("Classificação {tier}, mas sem template definido.");
    };

    let repeticoes = if stats.repetitions.is_empty() {
        NO_REPETITION_PHRASE.to_string()
    } else {
        stats.repetitions.describe()
    };

    templates[template_index(patient_id, templates.len())]
        .replace("{inicio}", &inicio)
        .replace("{fim}", &fim)
        .replace("{consultas}", &stats.done.to_string())
        .replace("{gasto}", &gasto)
        .replace("{intervalo}", &format!("{:.1}", stats.mean_gap_days))
        .replace("{repeticoes}", &repeticoes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repetition::{RepeatedGroup, RepetitionSummary};
    use chrono::NaiveDate;

    fn stats(done: u32, repetitions: RepetitionSummary) -> VisitStats {
        let first = NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        VisitStats {
            done,
            first_done: Some(first),
            last_done: Some(if done == 1 { first } else { last }),
            span_days: 60,
            mean_gap_days: 12.25,
            repetitions,
            ..VisitStats::default()
        }
    }

    #[test]
    fn single_visit_narrative_ignores_tier() {
        let s = stats(1, RepetitionSummary::default());
        let expected = "Após análise dos dados entre 10/01/2024 e 10/01/2024, constatei que o paciente realizou apenas uma consulta odontológica, totalizando um gasto de R$ 150.00. Como há apenas esse registro, não é possível calcular intervalos nem identificar repetições de procedimentos. Portanto, com base nos dados disponíveis, concluo que o paciente não apresenta nenhum risco.";
        for tier in RiskTier::KNOWN {
            assert_eq!(justify(3, &tier, &s, 150.0), expected);
        }
        assert_eq!(
            justify(3, &RiskTier::Unrecognized("X".into()), &s, 150.0),
            expected
        );
    }

    #[test]
    fn unknown_tier_gets_flagged_fallback() {
        let s = stats(4, RepetitionSummary::default());
        let text = justify(3, &RiskTier::Unrecognized("RiscoNovo".into()), &s, 10.0);
        assert_eq!(text, "Classificação RiscoNovo, mas sem template definido.");
    }

    #[test]
    fn selection_is_stable_per_patient() {
        let s = stats(6, RepetitionSummary::default());
        let a = justify(42, &RiskTier::ModerateUse, &s, 10.0);
        let b = justify(42, &RiskTier::ModerateUse, &s, 10.0);
        assert_eq!(a, b);
        assert!(template_index(42, 4) < 4);
    }

    #[test]
    fn placeholders_are_all_filled() {
        let repeated = RepetitionSummary {
            groups: vec![RepeatedGroup {
                name: "Alívio de dor".into(),
                count: 3,
            }],
        };
        for tier in RiskTier::KNOWN {
            for patient_id in 0..16 {
                let text = justify(patient_id, &tier, &stats(5, repeated.clone()), 1234.5);
                assert!(!text.contains('{'), "{text}");
                assert!(text.contains("10/01/2024"));
                assert!(text.contains("1234.50"));
                assert!(text.contains("12.2") || text.contains("12.3"));
            }
        }
    }

    #[test]
    fn missing_repetition_uses_phrase() {
        let s = stats(5, RepetitionSummary::default());
        for patient_id in 0..16 {
            let text = justify(patient_id, &RiskTier::ExcessiveUse, &s, 1.0);
            assert!(text.contains(NO_REPETITION_PHRASE), "{text}");
        }
    }
}
