//! Upstream communication subsystem.

pub mod fetcher;

pub use fetcher::{build_client, FetchError, HttpUpstream, Upstream};
