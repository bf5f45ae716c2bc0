pub mod collapse;
pub mod day_window;
pub mod grouping;
pub mod lanes;
pub mod scroll;
pub mod time_axis;
pub mod virtualizer;

pub use collapse::{CollapseAnimator, CollapsePhase};
pub use day_window::{clip_to_window, ClippedBar, DayWindow, ViewMode, MINUTES_PER_DAY};
pub use grouping::{build_rows, Bar, OpenSet, Row, UNASSIGNED_KEY};
pub use scroll::{ScrollCoordinator, ScrollOffset, ScrollTarget};
pub use time_axis::{TimeAxis, ZOOM_PRESETS};
pub use virtualizer::{content_height, visible_range, VisibleRows, DEFAULT_BUFFER_ROWS};
