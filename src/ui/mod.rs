pub mod board;
pub mod dialogs;
pub mod theme;
pub mod toolbar;
