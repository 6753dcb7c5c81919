use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use appointment_cell::services::BookingCoordinator;
use appointment_cell::store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
use doctor_cell::services::{InMemoryScheduleStore, ScheduleStore, SupabaseScheduleStore};
use shared_config::AppConfig;

fn build_stores(config: &AppConfig) -> (Arc<dyn ScheduleStore>, Arc<dyn AppointmentStore>) {
    if config.is_configured() {
        info!("Using Supabase stores at {}", config.supabase_url);
        (
            Arc::new(SupabaseScheduleStore::new(config)),
            Arc::new(SupabaseAppointmentStore::new(config)),
        )
    } else {
        info!("Keeping schedules and appointments in memory");
        (
            Arc::new(InMemoryScheduleStore::new()),
            Arc::new(InMemoryAppointmentStore::new()),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduling API server");

    let config = AppConfig::from_env();

    let (schedules, appointments) = build_stores(&config);
    let coordinator = Arc::new(BookingCoordinator::new(
        Arc::clone(&schedules),
        appointments,
        &config,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(schedules, coordinator)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
