//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use indicator_feed::config::{CredentialKind, FeedConfig, StaticCredentials};

/// Start a programmable mock upstream on an ephemeral port.
///
/// `f` receives the request target (path and query) and returns the status
/// code and body to send back.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
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
                        let target = read_request_target(&mut socket).await;
                        let (status, body) = f(target).await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read the request head and return the target of the request line.
async fn read_request_target(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string()
}

/// Records every request target the mock receives.
#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<String>>>);

impl RequestLog {
    pub fn push(&self, target: &str) {
        self.0.lock().unwrap().push(target.to_string());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.all().iter().filter(|t| t.contains(needle)).count()
    }
}

/// Config pointing every upstream at `addr`, with quick re-tries and no metrics.
pub fn config_for(addr: SocketAddr) -> FeedConfig {
    let base = format!("http://{addr}");
    let mut config = FeedConfig::default();
    config.endpoints.fred = base.clone();
    config.endpoints.twelve_data = base.clone();
    config.endpoints.fmp = base;
    config.retries.max_attempts = 2;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 20;
    config.timeouts.attempt_secs = 3;
    config.throttle.delay_ms = 0;
    config.throttle.concurrency = 4;
    config.metrics.clear();
    config
}

pub fn all_keys() -> Arc<StaticCredentials> {
    Arc::new(
        StaticCredentials::new()
            .with(CredentialKind::Fred, "fred-secret")
            .with(CredentialKind::TwelveData, "twelve-secret")
            .with(CredentialKind::Fmp, "fmp-secret"),
    )
}

/// Query parameter value from a request target.
pub fn query_param(target: &str, name: &str) -> Option<String> {
    let url = url::Url::parse(&format!("http://mock{target}")).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// FRED observations body from `(date, value)` pairs.
pub fn fred_body(points: &[(&str, &str)]) -> String {
    let observations: Vec<_> = points
        .iter()
        .map(|(date, value)| serde_json::json!({ "date": date, "value": value }))
        .collect();
    serde_json::json!({ "observations": observations }).to_string()
}
