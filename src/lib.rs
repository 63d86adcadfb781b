//! Intake Assist: conversational intake client core.

pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod intake;
