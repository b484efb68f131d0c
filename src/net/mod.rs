//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, resolved address)
//!     → tls.rs (optional TLS termination material)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently
//! - Bind failures are fatal at startup, before traffic is accepted

pub mod listener;
pub mod tls;
