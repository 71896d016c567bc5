//! MediaVault Core Library
//!
//! Domain models, error types and configuration shared by every MediaVault
//! component: the record store, the processing pipeline, the worker pool and
//! the command-line front end.

pub mod config;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, LogLevel};
