//! Live app status board

pub mod board;
pub mod dashboard;
