pub mod annuity;
mod engine;
mod error;
mod types;

pub use engine::{DEFAULT_EPF_DIVIDEND_RATE, ProjectionEngine, round_money};
pub use error::ProjectionError;
pub use types::{ProjectionInput, ProjectionResult};
