pub mod error;
pub mod loan;
pub mod metrics;
pub mod model;
pub mod parameters;
pub mod statements;
pub mod sweep;
pub mod time_value;
pub mod types;

pub use error::ImmoError;
pub use types::*;

/// Standard result type for all library functions
pub type ImmoResult<T> = Result<T, ImmoError>;
