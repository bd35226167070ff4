//! # AQA Telemetry
//!
//! Structured logging for the agent quality-assurance harness.
//!
//! ## Features
//! - Structured logging with `tracing`
//! - `RUST_LOG`-driven filtering with an `info` default
//! - Optional plain-text log file next to the run results
//! - Span helpers for suites, test cases, agent calls and metrics
//!
//! ## Usage
//!
//! ```rust
//! use aqa_telemetry::{init_telemetry, info, instrument};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry("aqa-runner")?;
//!
//!     #[instrument]
//!     async fn my_function() {
//!         info!("Function called");
//!     }
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Instrument, Span, debug, error, info, instrument, trace, warn};

// Re-export span helpers
pub use spans::*;

// Re-export init functions
pub use init::{init_telemetry, init_with_log_file};
