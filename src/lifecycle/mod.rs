//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Aggregator → Memory sampler → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, sampler exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then aggregator, then listener
//! - Listener binds last, so nothing is served before the aggregator exists

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
