pub mod api_client;
pub mod auth_service;
pub mod bids_service;
pub mod cases_service;
pub mod resources;
pub mod session;
pub mod users_service;
