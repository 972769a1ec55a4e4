//! Deterministic retirement funding projection: EPF and PRS balances at
//! retirement against the funds needed to sustain a target income.

pub mod api;
pub mod core;
pub mod store;
