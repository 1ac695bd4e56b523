pub mod config;
pub mod error;
pub mod json;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorKind};
