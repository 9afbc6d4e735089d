//! Domain models

pub mod app_status;
pub mod deployment;
