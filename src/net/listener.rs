//! TCP listener setup.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Report the resolved local address for logging
//!
//! The accept loop itself belongs to the serving layer; the listener is
//! handed over as a whole so graceful shutdown stays in one place.

use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Bind the gateway listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        "Listener bound"
    );

    Ok(listener)
}
