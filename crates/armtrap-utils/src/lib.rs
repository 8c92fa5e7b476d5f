//! # armtrap utilities
//!
//! Logging setup shared by the armtrap binary and anything embedding the core.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel, LoggingError, LoggingGuard};
