use async_trait::async_trait;
use chrono::NaiveTime;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::error::ScheduleError;
use crate::models::{DayAvailability, DayOfWeek, DaySchedule, WeeklySchedule};
use crate::services::schedule_store::ScheduleStore;

const TABLE: &str = "/rest/v1/doctor_weekly_schedules";

/// One row per (doctor, weekday); a missing row is an unscheduled day.
#[derive(Debug, Serialize, Deserialize)]
struct ScheduleRow {
    doctor_id: Uuid,
    day_of_week: i64,
    clinic_id: Uuid,
    start_time: NaiveTime,
    end_time: NaiveTime,
    slot_duration_minutes: i64,
    is_available: bool,
}

impl ScheduleRow {
    fn new(doctor_id: Uuid, day: DayOfWeek, schedule: &DaySchedule) -> Self {
        Self {
            doctor_id,
            day_of_week: day.into(),
            clinic_id: schedule.clinic_id,
            start_time: schedule.start_time,
            end_time: schedule.end_time,
            slot_duration_minutes: schedule.slot_duration_minutes,
            is_available: schedule.available,
        }
    }
}

pub struct SupabaseScheduleStore {
    supabase: SupabaseClient,
}

impl SupabaseScheduleStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

fn persistence(err: anyhow::Error) -> ScheduleError {
    ScheduleError::Persistence(err.to_string())
}

#[async_trait]
impl ScheduleStore for SupabaseScheduleStore {
    async fn get_weekly_schedule(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<WeeklySchedule>, ScheduleError> {
        debug!("Fetching weekly schedule for doctor: {}", doctor_id);

        let path = format!("{}?doctor_id=eq.{}&order=day_of_week.asc", TABLE, doctor_id);
        let rows: Vec<ScheduleRow> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(persistence)?;

        if rows.is_empty() {
            return Ok(None);
        }

        let mut weekly = WeeklySchedule::empty(doctor_id);
        for row in rows {
            let day = DayOfWeek::try_from(row.day_of_week)?;
            weekly.set_day(
                day,
                DayAvailability::Scheduled(DaySchedule {
                    clinic_id: row.clinic_id,
                    start_time: row.start_time,
                    end_time: row.end_time,
                    slot_duration_minutes: row.slot_duration_minutes,
                    available: row.is_available,
                }),
            );
        }

        Ok(Some(weekly))
    }

    async fn put_day_schedule(
        &self,
        doctor_id: Uuid,
        day: DayOfWeek,
        availability: DayAvailability,
    ) -> Result<WeeklySchedule, ScheduleError> {
        match &availability {
            DayAvailability::Unscheduled => {
                let path = format!(
                    "{}?doctor_id=eq.{}&day_of_week=eq.{}",
                    TABLE,
                    doctor_id,
                    day.number()
                );
                let _: Vec<Value> = self
                    .supabase
                    .request_with_headers(
                        Method::DELETE,
                        &path,
                        None,
                        Some(SupabaseClient::return_representation()),
                    )
                    .await
                    .map_err(persistence)?;
            }
            DayAvailability::Scheduled(schedule) => {
                schedule.validate()?;

                let mut headers = HeaderMap::new();
                headers.insert(
                    "Prefer",
                    HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
                );

                let body = serde_json::to_value(ScheduleRow::new(doctor_id, day, schedule))
                    .map_err(|e| ScheduleError::Persistence(e.to_string()))?;
                let path = format!("{}?on_conflict=doctor_id,day_of_week", TABLE);
                let _: Vec<Value> = self
                    .supabase
                    .request_with_headers(Method::POST, &path, Some(body), Some(headers))
                    .await
                    .map_err(persistence)?;
            }
        }

        Ok(self
            .get_weekly_schedule(doctor_id)
            .await?
            .unwrap_or_else(|| WeeklySchedule::empty(doctor_id)))
    }
}
