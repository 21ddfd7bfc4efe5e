//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, redacted headers)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stderr, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP trace span
//! - Metrics are cheap and disabled unless configured

pub mod logging;
pub mod metrics;
