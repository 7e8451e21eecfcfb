//! Tracing/logging setup shared by every teller process.

pub mod tracing;

pub use tracing::{init, init_with, LogFormat};
