//! Coordination of concurrent actions

pub mod cancel;
pub mod single_flight;
