pub mod deal;
pub mod error;
pub mod metrics;
pub mod time_value;
pub mod types;

#[cfg(feature = "pro_forma")]
pub mod pro_forma;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "recommendation")]
pub mod recommendation;

pub use error::UnderwriteError;
pub use types::*;

/// Standard result type for all underwriting computations
pub type UnderwriteResult<T> = Result<T, UnderwriteError>;
