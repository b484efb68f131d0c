//! Upstream origin subsystem.
//!
//! # Data Flow
//! ```text
//! Rewritten request
//!     → client.rs (pooled hyper client, connect + header timeouts)
//!     → origin
//!     → Response<Incoming> streamed back to the proxy handler
//! ```
//!
//! # Design Decisions
//! - One shared pool for the single origin; clones are handles
//! - No retries: each request is a single attempt, failures map to 502/504
//! - The response-header clock starts at the end of the request upload, so
//!   slow but progressing uploads are never cut off

pub mod client;

pub use client::{UpstreamClient, UpstreamError};
