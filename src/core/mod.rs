//! Configuration, domain types and the run's time window

pub mod config;
pub mod models;
pub mod window;
