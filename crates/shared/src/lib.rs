pub mod config;
pub mod errors;
pub mod types;

pub use config::Settings;
pub use errors::{AppError, AppResult, DomainError};
pub use types::*;
