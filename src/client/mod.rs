pub mod cli_client;
pub mod gate;
pub mod models;
pub mod services;
pub mod utils;
pub mod views;
