//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use vhost_proxy::config::{ProxyConfig, ServerConfig};
use vhost_proxy::{HttpServer, Shutdown};

/// A running echo backend.
pub struct EchoBackend {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl EchoBackend {
    /// Number of requests the backend has received.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

#[derive(Clone)]
struct EchoState {
    name: &'static str,
    hits: Arc<AtomicUsize>,
}

/// Start a backend that describes every request it receives.
///
/// `/slow` waits three seconds, `/created` answers 201 with a custom header,
/// anything else echoes method, URI, selected headers and body as
/// `key=value` lines.
pub async fn start_echo_backend(name: &'static str) -> EchoBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let app = Router::new().fallback(echo).with_state(EchoState {
        name,
        hits: hits.clone(),
    });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    EchoBackend { addr, hits }
}

async fn echo(State(state): State<EchoState>, request: Request<Body>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let path = request.uri().path().to_string();
    match path.as_str() {
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            return "slow".into_response();
        }
        "/created" => {
            return (StatusCode::CREATED, [("x-backend-name", state.name)], "created")
                .into_response();
        }
        _ => {}
    }

    // Owned lines only: the request body is awaited below.
    let mut lines = {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        };
        vec![
            format!("backend={}", state.name),
            format!("method={}", request.method()),
            format!("uri={}", request.uri()),
            format!("host={}", header("host")),
            format!("x-forwarded-host={}", header("x-forwarded-host")),
            format!("x-forwarded-for={}", header("x-forwarded-for")),
            format!("upgrade={}", header("upgrade")),
        ]
    };

    let body = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .unwrap();
    lines.push(format!("body={}", String::from_utf8_lossy(&body)));

    lines.join("\n").into_response()
}

/// Look up `key` in an echo response body.
pub fn echoed<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    body.lines().find_map(|line| {
        line.split_once('=')
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
    })
}

/// Config routing the given domains, listening anywhere.
pub fn proxy_config(routes: &[(&str, String)]) -> ProxyConfig {
    let proxy: toml::Table = routes
        .iter()
        .map(|(domain, url)| (domain.to_string(), toml::Value::String(url.clone())))
        .collect();

    ProxyConfig {
        server: Some(ServerConfig {
            address: "127.0.0.1".into(),
            port: 0,
        }),
        proxy: Some(proxy),
        ..Default::default()
    }
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let server = HttpServer::from_config(config).expect("valid routing table");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// A parsed HTTP/1.1 response.
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Send a request with an explicit `Host` header over a fresh connection.
pub async fn send_raw(
    proxy: SocketAddr,
    method: &str,
    host: &str,
    target: &str,
    body: &str,
) -> RawResponse {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let request = format!(
        "{method} {target} HTTP/1.1\r\nHost: {host}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    parse_response(&String::from_utf8_lossy(&raw))
}

/// Start a raw TCP backend that switches to the `echo` protocol.
///
/// It answers `101` only when the request carries `Upgrade: echo`, then
/// sends every byte it receives straight back. Anything else gets `400`.
pub async fn start_upgrade_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(upgrade_echo(stream));
        }
    });

    addr
}

async fn upgrade_echo(mut stream: TcpStream) {
    let head = read_head(&mut stream).await.to_ascii_lowercase();
    if !head.contains("\r\nupgrade: echo\r\n") {
        let _ = stream
            .write_all(b"HTTP/1.1 400 Bad Request\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await;
        return;
    }

    if stream
        .write_all(b"HTTP/1.1 101 Switching Protocols\r\nconnection: upgrade\r\nupgrade: echo\r\n\r\n")
        .await
        .is_err()
    {
        return;
    }

    let (mut reader, mut writer) = stream.split();
    let _ = tokio::io::copy(&mut reader, &mut writer).await;
}

/// Ask the proxy to switch `host` to `protocol` over a fresh connection.
///
/// Returns the response head and the connection, which speaks the new
/// protocol when the status is `101`.
pub async fn send_upgrade(proxy: SocketAddr, host: &str, protocol: &str) -> (RawResponse, TcpStream) {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let request = format!(
        "GET /ws HTTP/1.1\r\nHost: {host}\r\nConnection: Upgrade\r\nUpgrade: {protocol}\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let head = read_head(&mut stream).await;
    (parse_response(&head), stream)
}

/// Read up to and including the blank line that ends a message head.
async fn read_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte).await {
            Ok(1) => head.push(byte[0]),
            _ => break,
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

fn parse_response(raw: &str) -> RawResponse {
    let (head, body) = raw.split_once("\r\n\r\n").expect("complete response head");
    let mut lines = head.lines();

    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .expect("status line");

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let chunked = headers
        .iter()
        .any(|(k, v)| k.eq_ignore_ascii_case("transfer-encoding") && v.contains("chunked"));
    let body = if chunked { dechunk(body) } else { body.to_string() };

    RawResponse { status, headers, body }
}

fn dechunk(mut rest: &str) -> String {
    let mut out = String::new();
    while let Some((size, tail)) = rest.split_once("\r\n") {
        let size = usize::from_str_radix(size.trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        out.push_str(&tail[..size]);
        rest = tail[size..].trim_start_matches("\r\n");
    }
    out
}
