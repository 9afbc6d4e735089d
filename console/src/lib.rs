//! dockrune console library
//!
//! Client-side state for the dockrune admin API: the operator session, route
//! guard, deployment store and live app board, plus the workers that feed them.

pub mod app;
pub mod deployments;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod live;
pub mod logs;
pub mod models;
pub mod render;
pub mod router;
pub mod session;
pub mod storage;
pub mod sync;
pub mod utils;
pub mod workers;
