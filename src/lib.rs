pub mod config;
pub mod error;
pub mod models;
pub mod notes;
pub mod server;
pub mod telegram;
