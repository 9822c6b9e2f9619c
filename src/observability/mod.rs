//! Logging setup and log hygiene helpers.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the application. [`init_logging`] is a convenience for binaries and tests
//! that do not bring their own.
//!
//! ```rust,no_run
//! use restkit::observability::{init_logging, LoggingConfig};
//!
//! fn main() {
//!     if let Err(e) = init_logging(LoggingConfig::default()) {
//!         eprintln!("logging not initialized: {e}");
//!     }
//! }
//! ```

mod logging;
pub mod redact;

pub use logging::{init_logging, LoggingConfig, ObservabilityError};
pub use redact::{fingerprint, redact_secrets};
