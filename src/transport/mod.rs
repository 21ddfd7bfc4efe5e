//! Non-HTTP-server transports.
//!
//! The long-running server lives in `crate::http`. Adapters here feed the
//! same `ProxyService` from other hosting shapes and own the body encoding
//! their wire format requires.

pub mod function;

pub use function::{invoke, FunctionEvent, FunctionResponse};
