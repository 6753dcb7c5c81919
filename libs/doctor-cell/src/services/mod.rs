pub mod schedule_store;
pub mod slots;
pub mod supabase_schedule;

pub use schedule_store::{InMemoryScheduleStore, ScheduleStore};
pub use slots::{slot_starts, SlotGenerator};
pub use supabase_schedule::SupabaseScheduleStore;
