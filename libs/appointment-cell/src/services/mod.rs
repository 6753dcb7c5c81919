pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod subscription;

pub use booking::BookingCoordinator;
pub use conflict::{filter_available, overlaps, ConflictDetectionService};
pub use lifecycle::AppointmentLifecycleService;
pub use subscription::{AppointmentSubscription, SnapshotTrigger};
