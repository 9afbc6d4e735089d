//! Deployment records, their derived views and the store that owns them

pub mod feed;
pub mod set;
pub mod stats;
pub mod store;
