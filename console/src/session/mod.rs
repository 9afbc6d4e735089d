//! Operator session

pub mod state;
pub mod store;
