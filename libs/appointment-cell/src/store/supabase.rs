use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{PostgrestError, SupabaseClient};

use crate::error::StoreError;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::subscription::{AppointmentSubscription, SnapshotTrigger};

use super::{AppointmentStore, InsertOutcome, StatusUpdate};

const TABLE: &str = "/rest/v1/appointments";
/// Postgres function that re-runs the overlap check and inserts in one
/// transaction; returns no row on conflict.
const BOOK_RPC: &str = "/rest/v1/rpc/book_appointment_if_available";

/// Appointment store on Supabase/PostgREST. Atomicity of bookings comes from the
/// database (see `migrations/0001_appointments.sql`), so any number of API
/// processes may share it.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    poll_interval: Duration,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            poll_interval: Duration::from_secs(config.patient_feed_poll_seconds.max(1)),
        }
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    urlencoding::encode(&value.to_rfc3339_opts(SecondsFormat::Millis, true)).into_owned()
}

fn backend(err: anyhow::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

async fn fetch_patient_appointments(
    supabase: &SupabaseClient,
    patient_id: Uuid,
) -> Result<Vec<Appointment>, StoreError> {
    let path = format!("{}?patient_id=eq.{}&order=start_time.desc", TABLE, patient_id);
    supabase.request(Method::GET, &path, None).await.map_err(backend)
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn query_by_doctor_and_range(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?doctor_id=eq.{}&start_time=gte.{}&start_time=lte.{}&order=start_time.asc",
            TABLE,
            doctor_id,
            timestamp(from),
            timestamp(to)
        );

        self.supabase.request(Method::GET, &path, None).await.map_err(backend)
    }

    async fn list_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, StoreError> {
        fetch_patient_appointments(&self.supabase, patient_id).await
    }

    async fn query_by_patient(&self, patient_id: Uuid) -> Result<AppointmentSubscription, StoreError> {
        let supabase = Arc::clone(&self.supabase);

        Ok(AppointmentSubscription::spawn(
            move || {
                let supabase = Arc::clone(&supabase);
                async move { fetch_patient_appointments(&supabase, patient_id).await }
            },
            SnapshotTrigger::Poll(self.poll_interval),
        ))
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Appointment, StoreError> {
        let path = format!("{}?id=eq.{}", TABLE, appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(backend)?;

        rows.into_iter()
            .next()
            .ok_or(StoreError::NotFound(appointment_id))
    }

    async fn insert_if_available(&self, appointment: Appointment) -> Result<InsertOutcome, StoreError> {
        let body = json!({
            "p_id": appointment.id,
            "p_patient_id": appointment.patient_id,
            "p_doctor_id": appointment.doctor_id,
            "p_clinic_id": appointment.clinic_id,
            "p_start_time": appointment.start_time.to_rfc3339(),
            "p_duration_minutes": appointment.duration_minutes,
            "p_notes": appointment.notes,
            "p_created_at": appointment.created_at.to_rfc3339(),
        });

        let result: anyhow::Result<Vec<Appointment>> =
            self.supabase.request(Method::POST, BOOK_RPC, Some(body)).await;

        match result {
            Ok(rows) if rows.is_empty() => {
                debug!("Booking RPC reported conflict for doctor {}", appointment.doctor_id);
                Ok(InsertOutcome::Conflict)
            }
            Ok(rows) => Ok(InsertOutcome::Inserted(rows[0].id)),
            Err(err) => match err.downcast_ref::<PostgrestError>() {
                Some(api_error) if api_error.is_constraint_violation() => {
                    warn!(
                        "Constraint rejected booking for doctor {} at {}",
                        appointment.doctor_id, appointment.start_time
                    );
                    Ok(InsertOutcome::Conflict)
                }
                _ => Err(backend(err)),
            },
        }
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        expected: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<StatusUpdate, StoreError> {
        let path = format!("{}?id=eq.{}&status=eq.{}", TABLE, appointment_id, expected);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(json!({ "status": new_status })),
                Some(SupabaseClient::return_representation()),
            )
            .await
            .map_err(backend)?;

        match rows.into_iter().next() {
            Some(updated) => Ok(StatusUpdate::Updated(updated)),
            // Nothing matched: either gone or someone moved it first.
            None => Ok(StatusUpdate::Stale(self.get(appointment_id).await?.status)),
        }
    }
}
