//! Authenticating Reverse HTTP Proxy
//!
//! A single-hop gateway built with Tokio and Axum: requests carrying the
//! configured shared-secret header are forwarded to one fixed origin,
//! everything else is rejected at the edge.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                   AUTH GATEWAY                    │
//!                      │                                                   │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!   ───────────────────┼─▶│   net   │──▶│ security │──▶│     http     │   │
//!                      │  │listener │   │auth gate │   │proxy handler │   │
//!                      │  └─────────┘   └────┬─────┘   └──────┬───────┘   │
//!                      │                     │ 401            │           │
//!                      │                     ▼                ▼           │
//!   Client Response    │  ┌─────────┐               ┌──────────────┐     │
//!   ◀──────────────────┼──│response │◀──────────────│  upstream    │◀────┼──── Origin
//!                      │  │ scrub   │               │   client     │     │     Server
//!                      │  └─────────┘               └──────────────┘     │
//!                      │                                                   │
//!                      │  ┌─────────────────────────────────────────────┐ │
//!                      │  │           Cross-Cutting Concerns             │ │
//!                      │  │  ┌─────────┐ ┌────────────┐ ┌────────────┐  │ │
//!                      │  │  │ config  │ │observability│ │ lifecycle  │  │ │
//!                      │  │  │  (env)  │ │ logs+metrics│ │  shutdown  │  │ │
//!                      │  │  └─────────┘ └────────────┘ └────────────┘  │ │
//!                      │  └─────────────────────────────────────────────┘ │
//!                      └──────────────────────────────────────────────────┘
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_gateway::config::loader;
use auth_gateway::http::HttpServer;
use auth_gateway::lifecycle::{signals, Shutdown};
use auth_gateway::net;
use auth_gateway::observability::metrics;

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("auth-gateway v0.1.0 starting");

    let config = match loader::load_from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("auth-gateway: {}", error);
            std::process::exit(1);
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.upstream.origin,
        auth_header = %config.auth.header_name,
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    let listener = match net::listener::bind(config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(error) => {
            eprintln!(
                "auth-gateway: failed to bind {}: {}",
                config.listener.bind_address, error
            );
            std::process::exit(1);
        }
    };

    if let Some(address) = config.observability.metrics_address {
        metrics::init_metrics(address);
    }

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(signals::listen(shutdown));

    let server = match HttpServer::new(config) {
        Ok(server) => server,
        Err(error) => {
            eprintln!("auth-gateway: unusable upstream origin: {}", error);
            std::process::exit(1);
        }
    };

    if let Err(error) = server.run(listener, signal).await {
        tracing::error!(error = %error, "Server terminated abnormally");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}
