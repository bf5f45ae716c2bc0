pub mod csv_import;
pub mod file;

pub use file::{load_schedule, save_schedule, ScheduleFile};
