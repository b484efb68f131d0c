//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (request tracing, metrics, auth gate)
//! - Rewrite authorized requests for the origin hop
//! - Relay responses, including 101 upgrade handshakes
//! - Serve with a bounded drain window on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, Response, StatusCode, Version};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::any;
use axum::Router;
use hyper::body::Incoming;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tower::ServiceBuilder;

use crate::config::GatewayConfig;
use crate::http::headers::prepare_forward_headers;
use crate::http::request::ForwardTarget;
use crate::http::response::relay_response;
use crate::lifecycle::ShutdownSignal;
use crate::net::tls::load_rustls_config;
use crate::observability::{logging, metrics};
use crate::security::auth::require_shared_secret;
use crate::upstream::UpstreamClient;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub target: Arc<ForwardTarget>,
    pub client: UpstreamClient,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, axum::http::Error> {
        let target = ForwardTarget::new(&config.upstream.origin)?;
        let client = UpstreamClient::new(&config.timeouts);

        let config = Arc::new(config);
        let state = AppState {
            config: config.clone(),
            target: Arc::new(target),
            client,
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layer order, outermost first: tracing, metrics, auth. Rejected
    /// requests are logged and counted but never reach the handler.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                require_shared_secret,
            ))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(logging::trace_layer())
                    .layer(middleware::from_fn(metrics::track_requests)),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        signal: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            origin = %self.config.upstream.origin,
            "HTTP server starting"
        );

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            signal.triggered().await;
            tracing::info!(grace_secs = grace.as_secs(), "Draining connections");
            drain.graceful_shutdown(Some(grace));
        });

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();
        let std_listener = listener.into_std()?;

        match &self.config.listener.tls {
            Some(tls) => {
                let rustls = load_rustls_config(tls).await?;
                axum_server::from_tcp_rustls(std_listener, rustls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                axum_server::from_tcp(std_listener)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Forward an authorized request to the origin and relay the response.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response<Body> {
    let uri = match state.target.forward_uri(request.uri()) {
        Ok(uri) => uri,
        Err(error) => {
            tracing::error!(error = %error, "Failed to assemble origin URI");
            return (StatusCode::BAD_GATEWAY, "bad gateway").into_response();
        }
    };

    // Taken before the hop so a 101 from the origin can be joined back to
    // this connection.
    let client_upgrade = request.extensions_mut().remove::<OnUpgrade>();

    let upgrade_protocol = prepare_forward_headers(
        request.headers_mut(),
        state.target.host_header(),
        client_addr.ip(),
        state.config.listener.tls.is_some(),
        &state.config.auth,
    );

    let (mut parts, body) = request.into_parts();
    parts.uri = uri;
    // The client picks the wire protocol per origin connection; an inbound
    // HTTP/2 marker must not leak onto an HTTP/1 pool.
    parts.version = Version::HTTP_11;
    let outbound = Request::from_parts(parts, body);

    let mut upstream_response = match state.client.send(outbound).await {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(
                error = %error,
                origin = %state.target.authority(),
                "Origin request failed"
            );
            return (error.status(), error.body()).into_response();
        }
    };

    if upstream_response.status() == StatusCode::SWITCHING_PROTOCOLS {
        return match (upgrade_protocol, client_upgrade) {
            (Some(_), Some(client_upgrade)) => {
                spawn_upgrade_relay(client_upgrade, &mut upstream_response);
                relay_response(upstream_response)
            }
            _ => {
                tracing::error!("Origin switched protocols on a request that did not ask to upgrade");
                (StatusCode::BAD_GATEWAY, "bad gateway").into_response()
            }
        };
    }

    relay_response(upstream_response)
}

/// Join the two upgraded connections and shovel bytes both ways until either
/// side closes.
fn spawn_upgrade_relay(client_upgrade: OnUpgrade, upstream_response: &mut Response<Incoming>) {
    let origin_upgrade = hyper::upgrade::on(upstream_response);
    tokio::spawn(async move {
        let (client_io, origin_io) = match tokio::join!(client_upgrade, origin_upgrade) {
            (Ok(client_io), Ok(origin_io)) => (client_io, origin_io),
            (Err(error), _) | (_, Err(error)) => {
                tracing::error!(error = %error, "Upgrade handshake failed");
                return;
            }
        };

        let mut client_io = TokioIo::new(client_io);
        let mut origin_io = TokioIo::new(origin_io);
        match tokio::io::copy_bidirectional(&mut client_io, &mut origin_io).await {
            Ok((to_origin, to_client)) => {
                tracing::debug!(to_origin, to_client, "Upgraded connection closed");
            }
            Err(error) => {
                tracing::debug!(error = %error, "Upgraded connection errored");
            }
        }
    });
}
