#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use appointment_cell::models::BookAppointmentRequest;
use appointment_cell::services::BookingCoordinator;
use appointment_cell::store::{AppointmentStore, InMemoryAppointmentStore};
use doctor_cell::models::{DayAvailability, DayOfWeek, DaySchedule, WeeklySchedule};
use doctor_cell::services::InMemoryScheduleStore;
use shared_config::AppConfig;

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

pub struct TestSetup {
    pub coordinator: Arc<BookingCoordinator>,
    pub schedules: Arc<InMemoryScheduleStore>,
    pub appointments: Arc<InMemoryAppointmentStore>,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
}

impl TestSetup {
    /// Doctor works Mondays 09:00-11:00 at one clinic, 30-minute slots.
    pub async fn new() -> Self {
        let schedules = Arc::new(InMemoryScheduleStore::new());
        let appointments = Arc::new(InMemoryAppointmentStore::new());
        Self::with_stores(schedules, appointments.clone(), appointments).await
    }

    pub async fn with_stores(
        schedules: Arc<InMemoryScheduleStore>,
        appointments: Arc<InMemoryAppointmentStore>,
        appointment_port: Arc<dyn AppointmentStore>,
    ) -> Self {
        let doctor_id = Uuid::new_v4();
        let clinic_id = Uuid::new_v4();

        let monday = DaySchedule::new(clinic_id, time(9, 0), time(11, 0), 30).unwrap();
        schedules
            .insert(
                WeeklySchedule::empty(doctor_id)
                    .with_day(DayOfWeek::MONDAY, DayAvailability::Scheduled(monday)),
            )
            .await;

        let coordinator = Arc::new(BookingCoordinator::new(
            schedules.clone(),
            appointment_port,
            &AppConfig::default(),
        ));

        Self {
            coordinator,
            schedules,
            appointments,
            doctor_id,
            clinic_id,
            patient_id: Uuid::new_v4(),
        }
    }

    pub fn request_at(&self, start: DateTime<Utc>, minutes: i64) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            clinic_id: self.clinic_id,
            start_time: start,
            duration_minutes: minutes,
            notes: None,
        }
    }
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// 2024-01-01 is a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

pub fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

pub fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
}
