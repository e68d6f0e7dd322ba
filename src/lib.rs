// Library root. The binary entry point is src/main.rs.

pub mod api;
pub mod association;
pub mod config;
pub mod confirm;
pub mod console;
pub mod error;
pub mod logger;
pub mod modal;
pub mod pages;
pub mod routes;
pub mod store;
pub mod workflow;

pub use api::ApiClient;
pub use console::Console;
pub use error::{ApiError, AppError};
