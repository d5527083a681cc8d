//! Utilities: error handling, logging, time conversion

pub mod error;
pub mod logger;
pub mod time;

pub use error::{ApiResponse, AppError, AppResult, created, ok, ok_with_message, paginated};
