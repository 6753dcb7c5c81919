pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::{AppointmentError, StoreError};
pub use models::*;
pub use services::*;
pub use store::{AppointmentStore, InMemoryAppointmentStore, InsertOutcome, StatusUpdate, SupabaseAppointmentStore};
