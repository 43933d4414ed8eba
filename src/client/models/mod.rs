pub mod app_state;
pub mod listing;
pub mod ui_state;
pub mod view_state;
