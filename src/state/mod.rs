pub mod app;
pub mod stamps;

pub use app::AppState;
pub use stamps::{DayEntries, DayKey, Phase, StampContent, StampSet, StampStore, TimeOfDaySlot};
