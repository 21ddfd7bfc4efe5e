//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing request:
//!     → headers.rs (build outbound headers from an allowlist + defaults)
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//!     → redact.rs (mask credentials before logging)
//!
//! Password action:
//!     → password.rs (constant-time check of x-app-password)
//! ```
//!
//! # Design Decisions
//! - No trust in client input: nothing is forwarded unless named
//! - Credentials never reach logs or error bodies

pub mod headers;
pub mod password;
pub mod redact;

pub use headers::{strip_hop_by_hop, HeaderBuilder, HOP_BY_HOP_HEADERS};
pub use password::PasswordCheck;
