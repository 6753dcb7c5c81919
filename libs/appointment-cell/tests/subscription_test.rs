mod common;

use std::time::Duration;

use futures::StreamExt;
use tokio::time::timeout;

use appointment_cell::models::AppointmentStatus;

use common::{monday_at, TestSetup};

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_subscription_starts_with_current_snapshot() {
    let setup = TestSetup::new().await;
    setup
        .coordinator
        .book(setup.request_at(monday_at(9, 0), 30))
        .await
        .unwrap();

    let mut subscription = setup
        .coordinator
        .subscribe_patient_appointments(setup.patient_id)
        .await
        .unwrap();

    let first = timeout(WAIT, subscription.next_snapshot()).await.unwrap().unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].start_time, monday_at(9, 0));
}

#[tokio::test]
async fn test_subscription_emits_after_booking_and_cancel() {
    let setup = TestSetup::new().await;
    let mut subscription = setup
        .coordinator
        .subscribe_patient_appointments(setup.patient_id)
        .await
        .unwrap();

    let initial = timeout(WAIT, subscription.next()).await.unwrap().unwrap();
    assert!(initial.is_empty());

    let id = setup
        .coordinator
        .book(setup.request_at(monday_at(10, 0), 30))
        .await
        .unwrap();
    let booked = timeout(WAIT, subscription.next()).await.unwrap().unwrap();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].status, AppointmentStatus::Pending);

    setup.coordinator.cancel(id).await.unwrap();
    let cancelled = timeout(WAIT, subscription.next()).await.unwrap().unwrap();
    assert_eq!(cancelled[0].status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn test_other_patients_changes_are_not_emitted() {
    let setup = TestSetup::new().await;
    let mut subscription = setup
        .coordinator
        .subscribe_patient_appointments(setup.patient_id)
        .await
        .unwrap();
    timeout(WAIT, subscription.next()).await.unwrap().unwrap();

    let mut someone_else = setup.request_at(monday_at(9, 0), 30);
    someone_else.patient_id = uuid::Uuid::new_v4();
    setup.coordinator.book(someone_else).await.unwrap();

    assert!(timeout(Duration::from_millis(200), subscription.next())
        .await
        .is_err());
}

#[tokio::test]
async fn test_cancelled_subscription_does_not_block_bookings() {
    let setup = TestSetup::new().await;
    let subscription = setup
        .coordinator
        .subscribe_patient_appointments(setup.patient_id)
        .await
        .unwrap();
    subscription.cancel();

    for start in [monday_at(9, 0), monday_at(9, 30), monday_at(10, 0)] {
        setup
            .coordinator
            .book(setup.request_at(start, 30))
            .await
            .unwrap();
    }
    assert_eq!(
        setup
            .coordinator
            .patient_appointments(setup.patient_id)
            .await
            .unwrap()
            .len(),
        3
    );
}
