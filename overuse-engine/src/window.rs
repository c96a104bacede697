//! Selects the appointments that fall inside the analysis window.

use chrono::NaiveDateTime;
use overuse_core::Appointment;

const SECONDS_PER_DAY: i64 = 86_400;

/// An appointment that passed the window, with its parsed date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedAppointment<'a> {
    pub appointment: &'a Appointment,
    pub at: NaiveDateTime,
}

/// Result of windowing: kept appointments in input order plus skip counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowedAppointments<'a> {
    pub kept: Vec<DatedAppointment<'a>>,
    /// Appointments whose date string did not parse.
    pub unparseable: usize,
    /// Appointments in the future or older than the window.
    pub outside_window: usize,
}

impl<'a> WindowedAppointments<'a> {
    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }

    /// Completed appointments, in the order they were received.
    pub fn done(&self) -> impl Iterator<Item = &DatedAppointment<'a>> + '_ {
        self.kept.iter().filter(|dated| dated.appointment.is_done())
    }
}

/// Whole days from `earlier` to `later`, rounded toward negative infinity.
///
/// A delta of a few hours into the future is `-1`, not `0`.
pub fn floor_days(later: NaiveDateTime, earlier: NaiveDateTime) -> i64 {
    later
        .signed_duration_since(earlier)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY)
}

/// Keeps appointments with `0 <= days(reference - date) <= window_days`.
pub fn filter_window(
    appointments: &[Appointment],
    reference: NaiveDateTime,
    window_days: u32,
) -> WindowedAppointments<'_> {
    let mut windowed = WindowedAppointments::default();
    let limit = i64::from(window_days);

    for appointment in appointments {
        let Some(at) = appointment.scheduled_at() else {
            windowed.unparseable += 1;
            continue;
        };

        let delta = floor_days(reference, at);
        if (0..=limit).contains(&delta) {
            windowed.kept.push(DatedAppointment { appointment, at });
        } else {
            windowed.outside_window += 1;
        }
    }

    if windowed.unparseable > 0 {
        tracing::warn!(
            skipped = windowed.unparseable,
            "appointments with unreadable dates were left out of the window"
        );
    }

    windowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use overuse_core::{AppointmentStatus, Procedure};

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn appointment(id: u64, date_time: &str) -> Appointment {
        Appointment {
            id,
            date_time: date_time.to_string(),
            status: AppointmentStatus::Done,
            procedure: Procedure {
                id,
                type_name: "Alívio de dor".into(),
                description: None,
                cost: "R$ 100,00".into(),
            },
        }
    }

    #[test]
    fn boundary_day_is_included_and_next_is_not() {
        // 2023-07-01 12:00 is exactly 365 days before the reference.
        let items = vec![
            appointment(1, "01/07/2023 12:00"),
            appointment(2, "30/06/2023 12:00"),
        ];
        let windowed = filter_window(&items, reference(), 365);
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed.kept[0].appointment.id, 1);
        assert_eq!(windowed.outside_window, 1);
    }

    #[test]
    fn future_appointments_are_dropped() {
        let items = vec![
            appointment(1, "30/06/2024 15:00"),
            appointment(2, "05/07/2024 09:00"),
            appointment(3, "30/06/2024 08:00"),
        ];
        let windowed = filter_window(&items, reference(), 365);
        let ids: Vec<u64> = windowed.kept.iter().map(|d| d.appointment.id).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(windowed.outside_window, 2);
    }

    #[test]
    fn unparseable_dates_are_counted_not_fatal() {
        let items = vec![
            appointment(1, "2024-06-01 10:00"),
            appointment(2, "sem data"),
            appointment(3, "01/06/2024 10:00"),
        ];
        let windowed = filter_window(&items, reference(), 365);
        assert_eq!(windowed.unparseable, 2);
        assert_eq!(windowed.len(), 1);
    }

    #[test]
    fn input_order_is_preserved() {
        let items = vec![
            appointment(1, "10/05/2024 10:00"),
            appointment(2, "01/01/2024 10:00"),
            appointment(3, "20/03/2024 10:00"),
        ];
        let windowed = filter_window(&items, reference(), 365);
        let ids: Vec<u64> = windowed.kept.iter().map(|d| d.appointment.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn floor_days_rounds_down() {
        let r = reference();
        assert_eq!(floor_days(r, r), 0);
        assert_eq!(floor_days(r, r + chrono::Duration::hours(3)), -1);
        assert_eq!(floor_days(r, r - chrono::Duration::hours(47)), 1);
    }
}
