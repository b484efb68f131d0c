//! Pooled HTTP client for the origin.
//!
//! # Responsibilities
//! - Own the connection pool to the configured origin
//! - Apply the connect and response-header timeouts
//! - Classify failures for the status relayed to the client

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use hyper::body::{Body as HttpBody, Bytes, Frame, Incoming, SizeHint};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::sync::oneshot;

use crate::config::TimeoutConfig;

/// Error type for origin requests.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The origin could not be reached at all.
    #[error("origin unreachable: {0}")]
    Connect(#[source] hyper_util::client::legacy::Error),

    /// The exchange failed after the connection was established.
    #[error("origin request failed: {0}")]
    Request(#[source] hyper_util::client::legacy::Error),

    /// The origin accepted the request but produced no response headers in time.
    #[error("origin produced no response within {0:?}")]
    ResponseHeaderTimeout(Duration),
}

impl UpstreamError {
    /// Status relayed to the client for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamError::Connect(_) | UpstreamError::Request(_) => StatusCode::BAD_GATEWAY,
            UpstreamError::ResponseHeaderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Fixed body text paired with `status`.
    pub fn body(&self) -> &'static str {
        match self {
            UpstreamError::Connect(_) | UpstreamError::Request(_) => "bad gateway",
            UpstreamError::ResponseHeaderTimeout(_) => "gateway timeout",
        }
    }
}

/// Pooled client for the configured origin.
///
/// Cheap to clone; all clones share the same pool.
#[derive(Clone)]
pub struct UpstreamClient {
    inner: Client<HttpsConnector<HttpConnector>, UploadBody>,
    response_header_timeout: Duration,
}

impl UpstreamClient {
    /// Build the client with the configured timeouts.
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.enforce_http(false);

        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(connector);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .build(connector);

        Self {
            inner,
            response_header_timeout: Duration::from_secs(timeouts.response_header_secs),
        }
    }

    /// Send a request to the origin.
    ///
    /// The deadline covers connection establishment and the wait for response
    /// headers. It arms only once the request body has been handed to the
    /// connection in full, so a slow upload is never billed as a stalled
    /// origin; body streaming in either direction stays unbounded.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Incoming>, UpstreamError> {
        let streaming_upload = !request.body().is_end_stream();
        let (parts, body) = request.into_parts();
        let (body, upload_done) = UploadBody::new(body);
        let in_flight = self.inner.request(Request::from_parts(parts, body));
        tokio::pin!(in_flight);

        if streaming_upload {
            tokio::select! {
                result = &mut in_flight => return classify(result),
                _ = upload_done => {}
            }
        }

        let deadline = self.response_header_timeout;
        match tokio::time::timeout(deadline, &mut in_flight).await {
            Ok(result) => classify(result),
            Err(_) => Err(UpstreamError::ResponseHeaderTimeout(deadline)),
        }
    }
}

fn classify(
    result: Result<Response<Incoming>, hyper_util::client::legacy::Error>,
) -> Result<Response<Incoming>, UpstreamError> {
    match result {
        Ok(response) => Ok(response),
        Err(error) if error.is_connect() => Err(UpstreamError::Connect(error)),
        Err(error) => Err(UpstreamError::Request(error)),
    }
}

/// Request body wrapper that reports when the final byte has been handed to
/// the connection; that hand-off is what starts the response-header clock.
struct UploadBody {
    inner: Body,
    done: Option<oneshot::Sender<()>>,
}

impl UploadBody {
    fn new(inner: Body) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let body = Self {
            inner,
            done: Some(tx),
        };
        (body, rx)
    }

    fn mark_done(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

impl HttpBody for UploadBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(None) => this.mark_done(),
            // The connection stops polling a body that advertises its end, so
            // the final frame counts as the hand-off.
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.mark_done(),
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for UploadBody {
    fn drop(&mut self) {
        // The connection may drop the body instead of polling it to the end.
        self.mark_done();
    }
}
