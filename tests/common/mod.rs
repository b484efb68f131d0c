//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};

use auth_gateway::config::{
    AuthConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, TimeoutConfig, UpstreamConfig,
};
use auth_gateway::http::HttpServer;
use auth_gateway::lifecycle::Shutdown;

pub const AUTH_HEADER: &str = "x-gateway-key";
pub const AUTH_VALUE: &str = "secret-token";

/// Build a gateway config pointing at the given origin URL.
pub fn gateway_config(origin: &str) -> GatewayConfig {
    GatewayConfig {
        listener: ListenerConfig::default(),
        upstream: UpstreamConfig {
            origin: url::Url::parse(origin).unwrap(),
        },
        auth: AuthConfig {
            header_name: AUTH_HEADER.parse().unwrap(),
            header_value: AUTH_VALUE.parse().unwrap(),
            forward_to_origin: true,
        },
        timeouts: TimeoutConfig::default(),
        observability: ObservabilityConfig::default(),
    }
}

/// Start the gateway on an ephemeral port.
///
/// Returns its address and the shutdown handle; trigger it to stop the
/// server at the end of the test.
pub async fn spawn_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let server = HttpServer::new(config).unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    (addr, shutdown)
}

/// Read from the socket until `marker` has been seen (or the peer closes).
pub async fn read_until(socket: &mut TcpStream, marker: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    while !buf.ends_with(marker) {
        match socket.read(&mut byte).await {
            Ok(0) | Err(_) => break,
            Ok(_) => buf.push(byte[0]),
        }
    }
    buf
}

/// Read one full HTTP/1.1 request (head plus Content-Length or chunked body).
pub async fn read_http_request(socket: &mut TcpStream) -> String {
    let head = read_until(socket, b"\r\n\r\n").await;
    let text = String::from_utf8_lossy(&head).into_owned();

    let mut content_length = 0;
    let mut chunked = false;
    for line in text.lines() {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
            if name.eq_ignore_ascii_case("transfer-encoding") {
                chunked = value.trim().eq_ignore_ascii_case("chunked");
            }
        }
    }
    if chunked {
        // The chunk framing stays in the transcript; tests match substrings.
        let body = read_until(socket, b"0\r\n\r\n").await;
        return text + &String::from_utf8_lossy(&body);
    }
    if content_length == 0 {
        return text;
    }

    let mut body = vec![0u8; content_length];
    if socket.read_exact(&mut body).await.is_err() {
        return text;
    }
    text + &String::from_utf8_lossy(&body)
}

/// Send one raw HTTP/1.1 request and collect the raw response bytes.
///
/// The request should carry `Connection: close` so the read terminates.
#[allow(dead_code)]
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    let _ = socket.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// Origin that records each received request and answers with the given raw
/// response bytes.
pub async fn start_recording_origin(
    raw_response: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let request = read_http_request(&mut socket).await;
                        let _ = tx.send(request);
                        let _ = socket.write_all(raw_response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, rx)
}

/// Origin driven by a closure returning (status, body) per request.
#[allow(dead_code)]
pub async fn start_programmable_origin<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let _ = read_http_request(&mut socket).await;
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Origin that sends the first chunk of a response immediately and holds the
/// tail until notified. Serves a single connection.
#[allow(dead_code)]
pub async fn start_streaming_origin() -> (SocketAddr, Arc<Notify>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let release = Arc::new(Notify::new());
    let gate = release.clone();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let _ = read_http_request(&mut socket).await;
            let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nfirst\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.flush().await;
            gate.notified().await;
            let _ = socket.write_all(b"4\r\ntail\r\n0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
    });

    (addr, release)
}

/// Origin that streams chunks forever and reports the moment its writes
/// start failing, which is when the gateway hung up. Serves a single
/// connection.
#[allow(dead_code)]
pub async fn start_endless_origin() -> (SocketAddr, mpsc::UnboundedReceiver<Instant>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let _ = read_http_request(&mut socket).await;
            let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            loop {
                if socket.write_all(b"4\r\ntick\r\n").await.is_err() {
                    let _ = tx.send(Instant::now());
                    break;
                }
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    });

    (addr, rx)
}

/// Origin that starts a chunked response and then drops the connection
/// mid-body. Serves a single connection.
#[allow(dead_code)]
pub async fn start_aborting_origin() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let _ = read_http_request(&mut socket).await;
            let head = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n7\r\npartial\r\n";
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            // Reset instead of FIN so the break is unmistakable downstream.
            let _ = socket2::SockRef::from(&socket).set_linger(Some(Duration::from_secs(0)));
            drop(socket);
        }
    });

    addr
}

/// Origin that answers every request with 101 and echoes all bytes after the
/// handshake.
#[allow(dead_code)]
pub async fn start_upgrade_echo_origin() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let _ = read_until(&mut socket, b"\r\n\r\n").await;
                        let head =
                            "HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: echo\r\n\r\n";
                        if socket.write_all(head.as_bytes()).await.is_err() {
                            return;
                        }
                        let mut buf = [0u8; 1024];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    if socket.write_all(&buf[..n]).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
