//! Vetiver: a small HTTP service gateway whose behavior can be extended at
//! runtime by scripts delivered through a remote configuration endpoint.
//!
//! Three pieces around a shared component runtime:
//!
//! - [`http`] serves the API and owns the terminal error responder;
//! - [`sync`] fetches the remote runtime-config payload, fire-and-forget;
//! - [`exec`] compiles the payload's code string and runs it once with
//!   access to the host module table.

pub mod config;
pub mod error;
pub mod exec;
pub mod http;
pub mod logger;
pub mod runtime;
pub mod sync;
