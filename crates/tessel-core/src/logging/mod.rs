//! Logger initialization.
//!
//! The crate itself only talks to the `log` facade. Binaries and tests pick
//! a backend; [`init_logging`] wires up `env_logger` for the common case.

mod init;

pub use init::{LoggingConfig, init_logging};
