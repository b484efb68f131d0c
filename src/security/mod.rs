//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → auth.rs (shared-secret header check)
//!     → Pass to proxy handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any mismatch
//! - Unauthorized requests never reach the origin
//! - No trust in client input

pub mod auth;

pub use auth::require_shared_secret;
