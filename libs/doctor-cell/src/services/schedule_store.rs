use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::models::{DayAvailability, DayOfWeek, WeeklySchedule};

/// Where each doctor's recurring weekly hours live.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// `Ok(None)` when the doctor has never been given a schedule.
    async fn get_weekly_schedule(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<WeeklySchedule>, ScheduleError>;

    /// Replace one weekday and return the resulting week.
    async fn put_day_schedule(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
        availability: DayAvailability,
    ) -> Result<WeeklySchedule, ScheduleError>;
}

#[derive(Default)]
pub struct InMemoryScheduleStore {
    schedules: RwLock<HashMap<Uuid, WeeklySchedule>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, schedule: WeeklySchedule) {
        let mut schedules = self.schedules.write().await;
        schedules.insert(schedule.doctor_id, schedule);
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn get_weekly_schedule(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<WeeklySchedule>, ScheduleError> {
        let schedules = self.schedules.read().await;
        Ok(schedules.get(&doctor_id).cloned())
    }

    async fn put_day_schedule(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
        availability: DayAvailability,
    ) -> Result<WeeklySchedule, ScheduleError> {
        if let Some(schedule) = availability.schedule() {
            schedule.validate()?;
        }

        debug!("Setting day {} for doctor {}", day.number(), doctor_id);

        let mut schedules = self.schedules.write().await;
        let weekly = schedules
            .entry(doctor_id)
            .or_insert_with(|| WeeklySchedule::empty(doctor_id));
        weekly.set_day(day, availability);

        Ok(weekly.clone())
    }
}
