//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber wakes → server stops accepting → in-flight calls drain → exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; the server and any background task subscribe to it
//! - No config reload: a restart picks up new settings

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
