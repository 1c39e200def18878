pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod scrape;
pub mod telemetry;
pub mod view_mode;

pub use config::Settings;
pub use error::{AppError, Result};
pub use routes::AppState;
