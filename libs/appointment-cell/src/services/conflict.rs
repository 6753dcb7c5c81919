use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppointmentError;
use crate::models::Appointment;
use crate::store::AppointmentStore;

/// `start + minutes`, or `None` when the instant is not representable.
pub fn checked_end(start: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    Duration::try_minutes(minutes).and_then(|length| start.checked_add_signed(length))
}

/// End instant clamped to the last representable one.
pub fn saturating_end(start: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    checked_end(start, minutes).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Half-open intervals `[a, a + a_minutes)` and `[b, b + b_minutes)` share an instant.
/// Back-to-back intervals do not overlap.
pub fn overlaps(a: DateTime<Utc>, a_minutes: i64, b: DateTime<Utc>, b_minutes: i64) -> bool {
    a < saturating_end(b, b_minutes) && b < saturating_end(a, a_minutes)
}

/// True if `appointment` blocks `[start, start + duration_minutes)`.
pub fn blocks(appointment: &Appointment, start: DateTime<Utc>, duration_minutes: i64) -> bool {
    appointment.is_active()
        && overlaps(
            appointment.start_time,
            appointment.duration_minutes,
            start,
            duration_minutes,
        )
}

/// Candidates that no active appointment overlaps, order preserved.
pub fn filter_available(
    candidates: &[DateTime<Utc>],
    slot_minutes: i64,
    appointments: &[Appointment],
) -> Vec<DateTime<Utc>> {
    candidates
        .iter()
        .copied()
        .filter(|start| !appointments.iter().any(|apt| blocks(apt, *start, slot_minutes)))
        .collect()
}

/// Bounds (inclusive) of a whole clinic day.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let last_second = chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(chrono::NaiveTime::MIN);
    (start, date.and_time(last_second).and_utc())
}

pub struct ConflictDetectionService {
    appointments: Arc<dyn AppointmentStore>,
    max_appointment_minutes: i64,
}

impl ConflictDetectionService {
    /// `max_appointment_minutes` must bound every stored duration; it sizes the
    /// look-back of the pre-filter query.
    pub fn new(appointments: Arc<dyn AppointmentStore>, max_appointment_minutes: i64) -> Self {
        Self {
            appointments,
            max_appointment_minutes,
        }
    }

    /// Store query window that contains every appointment able to overlap
    /// `[start, start + duration_minutes)`. Fails when either edge is not a
    /// representable instant.
    pub fn prefilter_window(
        &self,
        start: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), AppointmentError> {
        let from = Duration::try_minutes(self.max_appointment_minutes)
            .and_then(|look_back| start.checked_sub_signed(look_back));
        let to = checked_end(start, duration_minutes);

        match (from, to) {
            (Some(from), Some(to)) => Ok((from, to)),
            _ => Err(AppointmentError::TimeOutOfRange(start.to_string())),
        }
    }

    /// Active appointments overlapping the proposed interval.
    pub async fn find_conflicts(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let (from, to) = self.prefilter_window(start, duration_minutes)?;
        let candidates = self
            .appointments
            .query_by_doctor_and_range(doctor_id, from, to)
            .await?;

        let conflicts: Vec<Appointment> = candidates
            .into_iter()
            .filter(|apt| blocks(apt, start, duration_minutes))
            .collect();

        if !conflicts.is_empty() {
            warn!(
                "Conflict detected for doctor {} at {} - {} conflicting appointments",
                doctor_id,
                start,
                conflicts.len()
            );
        }

        Ok(conflicts)
    }

    pub async fn is_available(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<bool, AppointmentError> {
        Ok(self
            .find_conflicts(doctor_id, start, duration_minutes)
            .await?
            .is_empty())
    }

    /// Appointments that may overlap any slot on `date`, including ones that
    /// started late the previous day.
    pub async fn appointments_for_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let (day_start, day_end) = day_bounds(date);
        let from = Duration::try_minutes(self.max_appointment_minutes)
            .and_then(|look_back| day_start.checked_sub_signed(look_back))
            .ok_or_else(|| AppointmentError::TimeOutOfRange(date.to_string()))?;

        let appointments = self
            .appointments
            .query_by_doctor_and_range(doctor_id, from, day_end)
            .await?;

        debug!(
            "Fetched {} appointments around {} for doctor {}",
            appointments.len(),
            date,
            doctor_id
        );
        Ok(appointments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn appointment(start: DateTime<Utc>, minutes: i64, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::nil(),
            clinic_id: Uuid::nil(),
            start_time: start,
            duration_minutes: minutes,
            status,
            notes: None,
            created_at: start,
        }
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        assert!(!overlaps(at(9, 0), 30, at(9, 30), 30));
        assert!(!overlaps(at(9, 30), 30, at(9, 0), 30));
    }

    #[test]
    fn partial_and_nested_intervals_overlap() {
        assert!(overlaps(at(9, 0), 30, at(9, 15), 30));
        assert!(overlaps(at(9, 0), 120, at(9, 30), 15));
        assert!(overlaps(at(9, 30), 15, at(9, 0), 120));
        assert!(overlaps(at(9, 0), 30, at(9, 0), 30));
    }

    #[test]
    fn pending_appointment_removes_its_slot() {
        let candidates = [at(9, 0), at(9, 30), at(10, 0), at(10, 30)];
        let booked = [appointment(at(9, 30), 30, AppointmentStatus::Pending)];

        assert_eq!(
            filter_available(&candidates, 30, &booked),
            vec![at(9, 0), at(10, 0), at(10, 30)]
        );
    }

    #[test]
    fn cancelled_appointments_do_not_block() {
        let candidates = [at(9, 0), at(9, 30)];
        let booked = [appointment(at(9, 30), 30, AppointmentStatus::Cancelled)];

        assert_eq!(filter_available(&candidates, 30, &booked), candidates.to_vec());
    }

    #[test]
    fn completed_and_confirmed_appointments_block() {
        let candidates = [at(9, 0), at(9, 30), at(10, 0)];
        let booked = [
            appointment(at(9, 0), 30, AppointmentStatus::Completed),
            appointment(at(9, 45), 10, AppointmentStatus::Confirmed),
        ];

        assert_eq!(filter_available(&candidates, 30, &booked), vec![at(10, 0)]);
    }

    #[test]
    fn long_appointment_blocks_every_covered_slot() {
        let candidates = [at(9, 0), at(9, 30), at(10, 0), at(10, 30)];
        let booked = [appointment(at(9, 15), 60, AppointmentStatus::Pending)];

        let free = filter_available(&candidates, 30, &booked);
        assert_eq!(free, vec![at(10, 30)]);
        for slot in &free {
            assert!(!booked.iter().any(|apt| blocks(apt, *slot, 30)));
        }
    }

    #[test]
    fn overlap_near_the_end_of_time_does_not_overflow() {
        let late = DateTime::<Utc>::MAX_UTC - Duration::minutes(10);
        assert!(overlaps(late, 30, late, 30));
        assert!(!overlaps(at(9, 0), 30, late, 30));
    }

    #[test]
    fn unrepresentable_prefilter_window_is_an_error() {
        let service = ConflictDetectionService::new(
            Arc::new(crate::store::InMemoryAppointmentStore::new()),
            240,
        );
        let late = DateTime::<Utc>::MAX_UTC - Duration::minutes(10);
        let early = DateTime::<Utc>::MIN_UTC + Duration::minutes(10);

        assert!(matches!(
            service.prefilter_window(late, 30),
            Err(AppointmentError::TimeOutOfRange(_))
        ));
        assert!(matches!(
            service.prefilter_window(early, 30),
            Err(AppointmentError::TimeOutOfRange(_))
        ));
        assert_eq!(
            service.prefilter_window(at(9, 0), 30).unwrap(),
            (at(5, 0), at(9, 30))
        );
    }

    #[test]
    fn day_bounds_cover_whole_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start, at(0, 0));
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap());

        let (_, last) = day_bounds(NaiveDate::MAX);
        assert_eq!(last.date_naive(), NaiveDate::MAX);
    }
}
