//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, catch-all route)
//!     → security::auth (shared-secret gate)
//!     → request.rs (origin URI assembly) + headers.rs (hop rewrite)
//!     → upstream client (pooled origin hop)
//!     → response.rs (scrub, stream back to client)
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use request::ForwardTarget;
pub use server::HttpServer;
