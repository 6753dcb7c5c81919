use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScheduleError;

// ==============================================================================
// WEEKDAYS
// ==============================================================================

/// Locale-independent weekday number: 1 = Monday .. 7 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub const MONDAY: DayOfWeek = DayOfWeek(1);
    pub const TUESDAY: DayOfWeek = DayOfWeek(2);
    pub const WEDNESDAY: DayOfWeek = DayOfWeek(3);
    pub const THURSDAY: DayOfWeek = DayOfWeek(4);
    pub const FRIDAY: DayOfWeek = DayOfWeek(5);
    pub const SATURDAY: DayOfWeek = DayOfWeek(6);
    pub const SUNDAY: DayOfWeek = DayOfWeek(7);

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn of_date(date: NaiveDate) -> Self {
        DayOfWeek::from(date.weekday())
    }

    pub fn all() -> impl Iterator<Item = DayOfWeek> {
        (1..=7).map(DayOfWeek)
    }

    fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        DayOfWeek(weekday.number_from_monday() as u8)
    }
}

impl TryFrom<i64> for DayOfWeek {
    type Error = ScheduleError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (1..=7).contains(&value) {
            Ok(DayOfWeek(value as u8))
        } else {
            Err(ScheduleError::InvalidWeekday(value))
        }
    }
}

impl From<DayOfWeek> for i64 {
    fn from(day: DayOfWeek) -> Self {
        day.0 as i64
    }
}

// ==============================================================================
// WEEKLY SCHEDULE
// ==============================================================================

/// Longest slot a day schedule may define: one full day.
pub const MAX_SLOT_MINUTES: i64 = 24 * 60;

/// A doctor's recurring hours for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub clinic_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i64,
    pub available: bool,
}

impl DaySchedule {
    pub fn new(
        clinic_id: Uuid,
        start_time: NaiveTime,
        end_time: NaiveTime,
        slot_duration_minutes: i64,
    ) -> Result<Self, ScheduleError> {
        let schedule = Self {
            clinic_id,
            start_time,
            end_time,
            slot_duration_minutes,
            available: true,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.slot_duration_minutes <= 0 || self.slot_duration_minutes > MAX_SLOT_MINUTES {
            return Err(ScheduleError::InvalidDuration(self.slot_duration_minutes));
        }
        if self.start_time >= self.end_time {
            return Err(ScheduleError::InvalidTimeRange);
        }
        Ok(())
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(self.slot_duration_minutes)
    }

    /// Opening and closing instants of this schedule on `date`.
    pub fn window_on(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            date.and_time(self.start_time).and_utc(),
            date.and_time(self.end_time).and_utc(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayAvailability {
    #[default]
    Unscheduled,
    Scheduled(DaySchedule),
}

impl DayAvailability {
    pub fn schedule(&self) -> Option<&DaySchedule> {
        match self {
            DayAvailability::Unscheduled => None,
            DayAvailability::Scheduled(schedule) => Some(schedule),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub doctor_id: Uuid,
    days: [DayAvailability; 7],
}

impl WeeklySchedule {
    /// A schedule with every day unscheduled.
    pub fn empty(doctor_id: Uuid) -> Self {
        Self {
            doctor_id,
            days: Default::default(),
        }
    }

    pub fn with_day(mut self, day: DayOfWeek, availability: DayAvailability) -> Self {
        self.set_day(day, availability);
        self
    }

    pub fn set_day(&mut self, day: DayOfWeek, availability: DayAvailability) {
        self.days[day.index()] = availability;
    }

    pub fn day(&self, day: DayOfWeek) -> &DayAvailability {
        &self.days[day.index()]
    }

    pub fn for_date(&self, date: NaiveDate) -> &DayAvailability {
        self.day(DayOfWeek::of_date(date))
    }

    pub fn days(&self) -> impl Iterator<Item = (DayOfWeek, &DayAvailability)> {
        DayOfWeek::all().map(move |day| (day, self.day(day)))
    }

    /// The day's schedule for `clinic_id`, or why there is none.
    pub fn resolve(&self, clinic_id: Uuid, date: NaiveDate) -> Result<&DaySchedule, ScheduleError> {
        let schedule = self
            .for_date(date)
            .schedule()
            .ok_or(ScheduleError::ScheduleNotFound(self.doctor_id))?;

        if schedule.clinic_id != clinic_id {
            return Err(ScheduleError::ClinicMismatch {
                scheduled: schedule.clinic_id,
                requested: clinic_id,
            });
        }
        if !schedule.available {
            return Err(ScheduleError::DayUnavailable);
        }

        Ok(schedule)
    }
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// Candidate start times for one doctor, clinic and date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGrid {
    pub date: NaiveDate,
    pub slot_duration_minutes: i64,
    pub starts: Vec<DateTime<Utc>>,
}

impl SlotGrid {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            slot_duration_minutes: 0,
            starts: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayScheduleRequest {
    pub clinic_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: i64,
    pub available: Option<bool>,
}

impl DayScheduleRequest {
    pub fn into_schedule(self) -> Result<DaySchedule, ScheduleError> {
        let schedule = DaySchedule::new(
            self.clinic_id,
            self.start_time,
            self.end_time,
            self.slot_duration_minutes,
        )?;
        Ok(match self.available {
            Some(false) => schedule.unavailable(),
            _ => schedule,
        })
    }
}

/// `schedule: null` clears the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutDayScheduleRequest {
    pub schedule: Option<DayScheduleRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayScheduleEntry {
    pub day_of_week: DayOfWeek,
    pub schedule: Option<DaySchedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyScheduleResponse {
    pub doctor_id: Uuid,
    pub days: Vec<DayScheduleEntry>,
}

impl From<&WeeklySchedule> for WeeklyScheduleResponse {
    fn from(schedule: &WeeklySchedule) -> Self {
        Self {
            doctor_id: schedule.doctor_id,
            days: schedule
                .days()
                .map(|(day_of_week, availability)| DayScheduleEntry {
                    day_of_week,
                    schedule: availability.schedule().cloned(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn nine_to_eleven(clinic_id: Uuid) -> DaySchedule {
        DaySchedule::new(
            clinic_id,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            30,
        )
        .unwrap()
    }

    #[test]
    fn weekday_numbers_start_on_monday() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(DayOfWeek::of_date(monday), DayOfWeek::MONDAY);
        assert_eq!(DayOfWeek::of_date(sunday).number(), 7);
        assert_matches!(DayOfWeek::try_from(0_i64), Err(ScheduleError::InvalidWeekday(0)));
        assert_matches!(DayOfWeek::try_from(8_i64), Err(ScheduleError::InvalidWeekday(8)));
    }

    #[test]
    fn day_schedule_rejects_bad_ranges() {
        let clinic = Uuid::new_v4();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();

        assert_matches!(
            DaySchedule::new(clinic, nine, ten, 0),
            Err(ScheduleError::InvalidDuration(0))
        );
        assert_matches!(
            DaySchedule::new(clinic, nine, ten, MAX_SLOT_MINUTES + 1),
            Err(ScheduleError::InvalidDuration(1441))
        );
        assert_matches!(
            DaySchedule::new(clinic, nine, ten, 1_000_000_000_000),
            Err(ScheduleError::InvalidDuration(_))
        );
        assert_matches!(
            DaySchedule::new(clinic, ten, nine, 30),
            Err(ScheduleError::InvalidTimeRange)
        );
        assert_matches!(
            DaySchedule::new(clinic, nine, nine, 30),
            Err(ScheduleError::InvalidTimeRange)
        );
    }

    #[test]
    fn resolve_explains_missing_availability() {
        let doctor = Uuid::new_v4();
        let clinic = Uuid::new_v4();
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();

        let weekly = WeeklySchedule::empty(doctor)
            .with_day(DayOfWeek::MONDAY, DayAvailability::Scheduled(nine_to_eleven(clinic)))
            .with_day(
                DayOfWeek::WEDNESDAY,
                DayAvailability::Scheduled(nine_to_eleven(clinic).unavailable()),
            );

        assert!(weekly.resolve(clinic, monday).is_ok());
        assert_matches!(weekly.resolve(clinic, tuesday), Err(ScheduleError::ScheduleNotFound(_)));
        assert_matches!(
            weekly.resolve(Uuid::new_v4(), monday),
            Err(ScheduleError::ClinicMismatch { .. })
        );
        assert_matches!(weekly.resolve(clinic, wednesday), Err(ScheduleError::DayUnavailable));
    }

    #[test]
    fn response_lists_all_seven_days() {
        let weekly = WeeklySchedule::empty(Uuid::new_v4());
        let response = WeeklyScheduleResponse::from(&weekly);
        assert_eq!(response.days.len(), 7);
        assert!(response.days.iter().all(|entry| entry.schedule.is_none()));
    }
}
