#![deny(unsafe_op_in_unsafe_fn)]
//! Tracing setup for the `rogueap` binary and its persisted logging config.
pub mod config;
pub mod fs;
pub mod init;
pub mod targets;

pub use config::LoggingConfig;
pub use init::{apply, init, LoggingGuards};
