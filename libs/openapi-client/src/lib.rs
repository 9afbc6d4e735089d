//! Wire models for the dockrune admin API.

pub mod models;
