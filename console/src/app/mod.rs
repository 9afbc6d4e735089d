//! Console wiring: options, owned state and the watch run loop

pub mod options;
pub mod run;
pub mod state;
