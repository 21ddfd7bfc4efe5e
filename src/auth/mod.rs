//! Upstream authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Request without client Authorization, upstream host:
//!     → credentials.rs (valid cached token? return it)
//!     → grant.rs (pick password / client_credentials / installed_client)
//!     → credentials.rs (POST token endpoint, cache with expiry)
//!     → token.rs (TokenCache judged against an injected Clock)
//!     → Return: bearer token or None (proceed unauthenticated)
//! ```
//!
//! # Design Decisions
//! - The cache is an explicit object, never a global
//! - A token within the refresh margin of expiry counts as expired
//! - Acquisition failures degrade to unauthenticated requests

pub mod credentials;
pub mod grant;
pub mod token;

pub use credentials::{CredentialManager, HttpTokenEndpoint, IssuedToken, TokenEndpoint, TokenError, TokenRequest};
pub use grant::Grant;
pub use token::{CachedToken, Clock, ManualClock, SystemClock, TokenCache};
