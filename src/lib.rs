pub mod availability;
pub mod bot_state;
pub mod config;
pub mod database;
pub mod error;
pub mod flow;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod phone;
