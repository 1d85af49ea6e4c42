//! Observability: log subscriber setup and audit event emission.

pub mod audit;
#[cfg(feature = "server")]
mod tracing_init;

#[cfg(feature = "server")]
pub use tracing_init::*;
