use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use appointment_cell::services::BookingCoordinator;
use doctor_cell::router::doctor_routes;
use doctor_cell::services::ScheduleStore;

pub fn create_router(schedules: Arc<dyn ScheduleStore>, coordinator: Arc<BookingCoordinator>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/doctors", doctor_routes(schedules))
        .nest("/appointments", appointment_routes(coordinator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use appointment_cell::store::InMemoryAppointmentStore;
    use doctor_cell::services::InMemoryScheduleStore;
    use shared_config::AppConfig;

    fn test_router() -> Router {
        let schedules: Arc<dyn ScheduleStore> = Arc::new(InMemoryScheduleStore::new());
        let coordinator = Arc::new(BookingCoordinator::new(
            Arc::clone(&schedules),
            Arc::new(InMemoryAppointmentStore::new()),
            &AppConfig::default(),
        ));
        create_router(schedules, coordinator)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn root_reports_running() {
        let (status, _) = call(&test_router(), "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn schedule_written_through_doctors_is_bookable_through_appointments() {
        let app = test_router();
        let doctor_id = Uuid::new_v4();
        let clinic_id = Uuid::new_v4();

        let (status, _) = call(
            &app,
            "PUT",
            &format!("/doctors/{}/schedule/1", doctor_id),
            Some(serde_json::json!({
                "schedule": {
                    "clinic_id": clinic_id,
                    "start_time": "09:00:00",
                    "end_time": "10:00:00",
                    "slot_duration_minutes": 30
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let slots_uri = format!(
            "/appointments/doctors/{}/available-slots?clinic_id={}&date=2024-01-01",
            doctor_id, clinic_id
        );
        let (_, body) = call(&app, "GET", &slots_uri, None).await;
        assert_eq!(body["slots"].as_array().unwrap().len(), 2);

        let (status, _) = call(
            &app,
            "POST",
            "/appointments",
            Some(serde_json::json!({
                "patient_id": Uuid::new_v4(),
                "doctor_id": doctor_id,
                "clinic_id": clinic_id,
                "start_time": "2024-01-01T09:00:00Z",
                "duration_minutes": 30,
                "notes": null
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = call(&app, "GET", &slots_uri, None).await;
        assert_eq!(body["slots"][0]["start_time"], "2024-01-01T09:30:00Z");
    }
}
