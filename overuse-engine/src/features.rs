//! Feature extraction shared by live analysis and dataset preparation.
//!
//! The column order in [`FEATURE_COLUMNS`] is the contract with the trained
//! classifier. Changing it requires retraining the model.

use chrono::NaiveDateTime;
use overuse_core::Patient;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, VisitStats};
use crate::taxonomy::Category;
use crate::window::filter_window;

/// Number of columns the classifier expects.
pub const FEATURE_COUNT: usize = 19;

/// Column names in the order the classifier was trained on.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "qtd_realizadas",
    "qtd_agendadas",
    "qtd_canceladas",
    "intervaloMedioDias",
    "periodoTotalDias",
    "gastoTotal",
    "numProcedsRepetidos",
    "count_ConsultaseDiagnóstico",
    "count_PrevençãoeProfilaxia",
    "count_UrgênciaeEmergência24h",
    "count_RadiologiaeExames",
    "count_Dentística",
    "count_CirurgiaOraleExtrações",
    "count_Endodontia",
    "count_Periodontia",
    "count_Odontopediatria",
    "count_Ortodontia",
    "count_OdontologiaEstética",
    "count_PrótesesDentárias",
];

const CATEGORY_OFFSET: usize = 7;

/// Spend parsed from a currency string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpendAmount {
    pub amount: f64,
    /// True when the input could not be read and `amount` fell back to 0.0.
    pub defaulted: bool,
}

/// Parses `"R$ 1.234,56"` style strings. Never fails; unreadable input is 0.0.
pub fn parse_spend(raw: &str) -> SpendAmount {
    let normalized = raw
        .replace("R$", "")
        .replace('.', "")
        .replace(',', ".");
    match normalized.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() => SpendAmount {
            amount,
            defaulted: false,
        },
        _ => SpendAmount {
            amount: 0.0,
            defaulted: true,
        },
    }
}

/// Fixed-order numeric input for one classification call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_stats(stats: &VisitStats, spend: f64) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        values[0] = f64::from(stats.done);
        values[1] = f64::from(stats.scheduled);
        values[2] = f64::from(stats.cancelled);
        values[3] = stats.mean_gap_days;
        values[4] = stats.span_days as f64;
        values[5] = spend;
        values[6] = f64::from(stats.repetitions.count());
        for (category, count) in stats.categories.iter() {
            values[CATEGORY_OFFSET + category.index()] = f64::from(count);
        }
        Self(values)
    }

    /// Builds a vector from named values. Unknown names are ignored and
    /// missing columns are 0.
    pub fn from_named<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut values = [0.0; FEATURE_COUNT];
        for (name, value) in pairs {
            if let Some(idx) = column_index(name) {
                values[idx] = value;
            }
        }
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value of a named column; 0 for unknown names.
    pub fn get(&self, name: &str) -> f64 {
        column_index(name).map(|idx| self.0[idx]).unwrap_or(0.0)
    }

    pub fn category(&self, category: Category) -> f64 {
        self.0[CATEGORY_OFFSET + category.index()]
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_COLUMNS.iter().copied().zip(self.0.iter().copied())
    }
}

fn column_index(name: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|column| *column == name)
}

/// Everything derived from one patient for one reference instant.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientFeatures {
    pub stats: VisitStats,
    pub spend: SpendAmount,
    pub vector: FeatureVector,
    /// Appointments dropped because their date did not parse.
    pub unparseable_dates: usize,
    /// Appointments dropped for being outside the window.
    pub outside_window: usize,
}

/// Runs window filter, aggregation and vector construction for a patient.
pub fn extract_features(
    patient: &Patient,
    reference: NaiveDateTime,
    window_days: u32,
) -> PatientFeatures {
    let windowed = filter_window(&patient.appointments, reference, window_days);
    let stats = aggregate(&windowed);
    let spend = parse_spend(&patient.total_spend);
    if spend.defaulted {
        tracing::debug!(patient = patient.id, raw = %patient.total_spend, "spend defaulted to 0");
    }
    let vector = FeatureVector::from_stats(&stats, spend.amount);

    PatientFeatures {
        stats,
        spend,
        vector,
        unparseable_dates: windowed.unparseable,
        outside_window: windowed.outside_window,
    }
}
