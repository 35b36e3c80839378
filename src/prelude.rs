pub use crate::error::AppError;

pub type Result<T, E = AppError> = core::result::Result<T, E>;
