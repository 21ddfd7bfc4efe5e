//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Validated target host
//!     → allowlist.rs (is this host permitted at all?)
//!     → Return: allowed or HostNotAllowed
//!
//! Outbound target (after credentials are attached)
//!     → rewrite.rs (server token + web host → OAuth host)
//!     → Return: URL to fetch
//! ```
//!
//! # Design Decisions
//! - Allowlist compiled at startup, immutable at runtime
//! - No regex in hot path (equality and dot-boundary suffix only)
//! - Fail closed: an unmatched host never reaches the network

pub mod allowlist;
pub mod rewrite;

pub use allowlist::Allowlist;
pub use rewrite::{AuthSource, UrlRewriter};
