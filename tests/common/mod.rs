//! Shared utilities for integration tests.

#![allow(dead_code)]

pub mod mmdb;

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use ipquery::enrich::{Contribution, Enricher, EnricherError, Section};

/// Start a programmable mock HTTP backend on an ephemeral port.
///
/// `f` receives the raw request head (request line and headers) and returns
/// the status code and body to send back.
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
                        let head = read_head(&mut socket).await;
                        let (status, body) = f(head).await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
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

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
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
    String::from_utf8_lossy(&buf).into_owned()
}

/// An enricher that always answers the same way.
pub struct StaticEnricher {
    pub name: &'static str,
    pub section: Section,
    pub answer: Result<Contribution, u16>,
    pub delay: Duration,
}

impl StaticEnricher {
    pub fn ok(name: &'static str, section: Section, contribution: Contribution) -> Arc<Self> {
        Arc::new(Self {
            name,
            section,
            answer: Ok(contribution),
            delay: Duration::ZERO,
        })
    }

    pub fn failing(name: &'static str, section: Section) -> Arc<Self> {
        Arc::new(Self {
            name,
            section,
            answer: Err(503),
            delay: Duration::ZERO,
        })
    }

    pub fn slow(name: &'static str, section: Section, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name,
            section,
            answer: Ok(Contribution::NotFound),
            delay,
        })
    }
}

#[async_trait]
impl Enricher for StaticEnricher {
    fn name(&self) -> &'static str {
        self.name
    }

    fn section(&self) -> Section {
        self.section
    }

    async fn enrich(&self, _addr: IpAddr) -> Result<Contribution, EnricherError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.answer {
            Ok(c) => Ok(c.clone()),
            Err(status) => Err(EnricherError::Status(*status)),
        }
    }
}
