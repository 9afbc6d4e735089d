//! Integration tests for the dockrune console

mod common;
mod test_live;
mod test_session;
mod test_socket;
