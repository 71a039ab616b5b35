pub mod aggregator;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod recurrence;
pub mod reset;
pub mod routes;
pub mod service;
pub mod store;

pub use error::{AppError, AppResult};
pub use routes::{app, AppState};
