//! Logging utilities.
//!
//! Centralizes logger initialization. Library code only uses the `log`
//! facade; the binary decides the backend once at process start.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
