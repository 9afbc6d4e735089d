//! Local storage

pub mod layout;
pub mod local;
pub mod settings;
