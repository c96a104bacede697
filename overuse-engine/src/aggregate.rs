//! Visit statistics over the windowed appointments.

use chrono::NaiveDateTime;
use overuse_core::{AppointmentStatus, DISPLAY_DATE_FORMAT};

use crate::repetition::RepetitionSummary;
use crate::taxonomy::{category_for, CategoryCounts};
use crate::window::{floor_days, WindowedAppointments};

/// Shown instead of a date when there is no completed visit.
pub const NO_DATE: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitStats {
    pub done: u32,
    pub scheduled: u32,
    pub cancelled: u32,
    pub first_done: Option<NaiveDateTime>,
    pub last_done: Option<NaiveDateTime>,
    /// Days between the earliest and latest completed visit.
    pub span_days: i64,
    /// Mean day delta between completed visits adjacent in input order.
    pub mean_gap_days: f64,
    pub categories: CategoryCounts,
    pub repetitions: RepetitionSummary,
}

impl VisitStats {
    pub fn first_done_label(&self) -> String {
        format_date(self.first_done)
    }

    pub fn last_done_label(&self) -> String {
        format_date(self.last_done)
    }
}

fn format_date(value: Option<NaiveDateTime>) -> String {
    value
        .map(|at| at.format(DISPLAY_DATE_FORMAT).to_string())
        .unwrap_or_else(|| NO_DATE.to_string())
}

/// Aggregates status counts, date statistics and per-category counts.
///
/// Gaps are taken between completed visits in the order they were received,
/// not in chronological order, so unsorted input can yield negative gaps.
pub fn aggregate(windowed: &WindowedAppointments<'_>) -> VisitStats {
    let mut stats = VisitStats::default();

    for dated in &windowed.kept {
        match dated.appointment.status {
            AppointmentStatus::Done => stats.done += 1,
            AppointmentStatus::Scheduled => stats.scheduled += 1,
            AppointmentStatus::Cancelled => stats.cancelled += 1,
            AppointmentStatus::Other(_) => {}
        }
    }

    let done_dates: Vec<NaiveDateTime> = windowed.done().map(|dated| dated.at).collect();
    stats.first_done = done_dates.iter().min().copied();
    stats.last_done = done_dates.iter().max().copied();

    if let (Some(first), Some(last)) = (stats.first_done, stats.last_done) {
        stats.span_days = floor_days(last, first);
    }

    if done_dates.len() > 1 {
        let gaps: Vec<i64> = done_dates
            .windows(2)
            .map(|pair| floor_days(pair[1], pair[0]))
            .collect();
        stats.mean_gap_days = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;
    }

    for dated in windowed.done() {
        if let Some(category) = category_for(&dated.appointment.procedure.type_name) {
            stats.categories.increment(category);
        }
    }

    stats.repetitions = RepetitionSummary::by_procedure_type(
        windowed
            .done()
            .map(|dated| dated.appointment.procedure.type_name.as_str()),
    );

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Category;
    use crate::window::filter_window;
    use chrono::NaiveDate;
    use overuse_core::{Appointment, Procedure};

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    }

    fn appointment(id: u64, date_time: &str, status: &str, procedure: &str) -> Appointment {
        Appointment {
            id,
            date_time: date_time.to_string(),
            status: AppointmentStatus::from(status),
            procedure: Procedure {
                id,
                type_name: procedure.to_string(),
                description: None,
                cost: "R$ 80,00".into(),
            },
        }
    }

    #[test]
    fn no_completed_visits_yield_neutral_stats() {
        let items = vec![
            appointment(1, "01/03/2024 10:00", "Agendada", "Alívio de dor"),
            appointment(2, "02/03/2024 10:00", "Cancelada", "Alívio de dor"),
        ];
        let windowed = filter_window(&items, reference(), 365);
        let stats = aggregate(&windowed);
        assert_eq!((stats.done, stats.scheduled, stats.cancelled), (0, 1, 1));
        assert_eq!(stats.first_done_label(), NO_DATE);
        assert_eq!(stats.last_done_label(), NO_DATE);
        assert_eq!(stats.span_days, 0);
        assert_eq!(stats.mean_gap_days, 0.0);
        assert_eq!(stats.categories.total(), 0);
    }

    #[test]
    fn gaps_follow_input_order() {
        let items = vec![
            appointment(1, "01/01/2024 10:00", "Realizada", "Alívio de dor"),
            appointment(2, "31/01/2024 10:00", "Realizada", "Raspagem de tártaro"),
            appointment(3, "11/01/2024 10:00", "Realizada", "Alívio de dor"),
        ];
        let windowed = filter_window(&items, reference(), 365);
        let stats = aggregate(&windowed);
        // +30 then -20
        assert_eq!(stats.mean_gap_days, 5.0);
        assert_eq!(stats.span_days, 30);
        assert_eq!(stats.first_done_label(), "01/01/2024");
        assert_eq!(stats.last_done_label(), "31/01/2024");
    }

    #[test]
    fn categories_count_only_completed_and_mapped() {
        let items = vec![
            appointment(1, "01/02/2024 10:00", "Realizada", "Raspagem de tártaro"),
            appointment(2, "02/02/2024 10:00", "Realizada", "Tratamento de gengivite"),
            appointment(3, "03/02/2024 10:00", "Agendada", "Raspagem de tártaro"),
            appointment(4, "04/02/2024 10:00", "Realizada", "Procedimento inexistente"),
        ];
        let windowed = filter_window(&items, reference(), 365);
        let stats = aggregate(&windowed);
        assert_eq!(stats.categories.get(Category::Periodontics), 2);
        assert_eq!(stats.categories.total(), 2);
        assert_eq!(stats.done, 3);
    }

    #[test]
    fn single_visit_has_zero_span_and_gap() {
        let items = vec![appointment(1, "15/05/2024 09:30", "Realizada", "Alívio de dor")];
        let windowed = filter_window(&items, reference(), 365);
        let stats = aggregate(&windowed);
        assert_eq!(stats.span_days, 0);
        assert_eq!(stats.mean_gap_days, 0.0);
        assert_eq!(stats.first_done_label(), stats.last_done_label());
    }

    #[test]
    fn unknown_status_is_kept_but_not_counted() {
        let items = vec![appointment(1, "15/05/2024 09:30", "Remarcada", "Alívio de dor")];
        let windowed = filter_window(&items, reference(), 365);
        let stats = aggregate(&windowed);
        assert_eq!(windowed.len(), 1);
        assert_eq!((stats.done, stats.scheduled, stats.cancelled), (0, 0, 0));
    }
}
