//! Admin API client

pub mod apps;
pub mod client;
pub mod deployments;
