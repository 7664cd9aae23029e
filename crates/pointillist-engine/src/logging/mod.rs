//! Logging utilities.
//!
//! Centralizes logger initialization. Engine code logs through the `log`
//! facade only; hosts pick the backend by calling [`init_logging`].

mod init;

pub use init::{init_logging, LoggingConfig};
