//! Background workers

pub mod socket;
