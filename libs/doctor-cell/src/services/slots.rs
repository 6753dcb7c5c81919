use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::models::{DaySchedule, SlotGrid, WeeklySchedule};
use crate::services::schedule_store::ScheduleStore;

/// Fixed-duration start times covering `day` on `date`.
///
/// Every start `s` satisfies `open <= s` and `s + duration <= close`; consecutive
/// starts are exactly one duration apart.
pub fn slot_starts(day: &DaySchedule, date: NaiveDate) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
    day.validate()?;

    let step = day.slot_duration();
    let (mut current, close) = day.window_on(date);
    let mut starts = Vec::new();

    // Stops early if a slot end is not representable (dates at the end of the calendar).
    while let Some(next) = current.checked_add_signed(step) {
        if next > close {
            break;
        }
        starts.push(current);
        current = next;
    }

    Ok(starts)
}

pub struct SlotGenerator {
    schedules: Arc<dyn ScheduleStore>,
}

impl SlotGenerator {
    pub fn new(schedules: Arc<dyn ScheduleStore>) -> Self {
        Self { schedules }
    }

    pub fn schedules(&self) -> &Arc<dyn ScheduleStore> {
        &self.schedules
    }

    /// Candidate start times in ascending order. Empty when the doctor does not
    /// work at `clinic_id` that day.
    pub async fn generate_slots(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<DateTime<Utc>>, ScheduleError> {
        Ok(self.slot_grid(doctor_id, clinic_id, date).await?.starts)
    }

    #[instrument(skip(self))]
    pub async fn slot_grid(
        &self,
        doctor_id: Uuid,
        clinic_id: Uuid,
        date: NaiveDate,
    ) -> Result<SlotGrid, ScheduleError> {
        let weekly = self
            .schedules
            .get_weekly_schedule(doctor_id)
            .await?
            .unwrap_or_else(|| WeeklySchedule::empty(doctor_id));

        let day = match weekly.resolve(clinic_id, date) {
            Ok(day) => day,
            Err(reason) if reason.is_no_availability() => {
                debug!("No slots for doctor {} on {}: {}", doctor_id, date, reason);
                return Ok(SlotGrid::empty(date));
            }
            Err(e) => return Err(e),
        };

        let starts = slot_starts(day, date)?;
        debug!("Generated {} slots for doctor {} on {}", starts.len(), doctor_id, date);

        Ok(SlotGrid {
            date,
            slot_duration_minutes: day.slot_duration_minutes,
            starts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, NaiveTime};

    fn day(start: (u32, u32), end: (u32, u32), minutes: i64) -> DaySchedule {
        DaySchedule {
            clinic_id: Uuid::nil(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            slot_duration_minutes: minutes,
            available: true,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn last_slot_ends_exactly_at_close() {
        let starts = slot_starts(&day((9, 0), (11, 0), 30), date()).unwrap();
        let times: Vec<_> = starts.iter().map(|s| s.time()).collect();
        assert_eq!(
            times,
            vec![
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn partial_trailing_slot_is_dropped() {
        let schedule = day((9, 0), (10, 50), 25);
        let starts = slot_starts(&schedule, date()).unwrap();
        let (open, close) = schedule.window_on(date());

        assert_eq!(starts.len(), 4);
        for pair in starts.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::minutes(25));
        }
        for start in &starts {
            assert!(*start >= open);
            assert!(*start + Duration::minutes(25) <= close);
        }
    }

    #[test]
    fn window_shorter_than_one_slot_is_empty() {
        assert!(slot_starts(&day((9, 0), (9, 20), 30), date()).unwrap().is_empty());
    }

    #[test]
    fn last_representable_date_does_not_overflow() {
        let starts = slot_starts(&day((9, 0), (11, 0), 30), NaiveDate::MAX).unwrap();
        assert_eq!(starts.len(), 4);
    }

    #[test]
    fn oversized_duration_is_rejected() {
        assert_matches!(
            slot_starts(&day((9, 0), (10, 0), 1_000_000_000_000), date()),
            Err(ScheduleError::InvalidDuration(1_000_000_000_000))
        );
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        assert_matches!(
            slot_starts(&day((9, 0), (10, 0), 0), date()),
            Err(ScheduleError::InvalidDuration(0))
        );
    }
}
