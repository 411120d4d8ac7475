//! Shared fixtures for unit tests.

use crate::backend::StructuredBackend;
use crate::debate::Prompt;
use crate::error::{Error, Result};
use crate::schema::OutputSchema;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing_subscriber::fmt::MakeWriter;

/// Backend that replays a fixed list of outcomes and records every call
pub(crate) struct ScriptedBackend {
    script: Mutex<VecDeque<Result<Value>>>,
    calls: Mutex<Vec<(Instant, Prompt, &'static str)>>,
}

impl ScriptedBackend {
    pub(crate) fn new(script: Vec<Result<Value>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Start time of each call, relative to the first call
    pub(crate) fn call_offsets(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        let Some((first, _, _)) = calls.first() else {
            return Vec::new();
        };
        calls.iter().map(|(at, _, _)| at.duration_since(*first)).collect()
    }

    pub(crate) fn prompts(&self) -> Vec<Prompt> {
        self.calls.lock().unwrap().iter().map(|(_, p, _)| p.clone()).collect()
    }

    pub(crate) fn schema_names(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(_, _, s)| *s).collect()
    }
}

#[async_trait]
impl StructuredBackend for ScriptedBackend {
    async fn invoke(&self, prompt: &Prompt, schema: &OutputSchema) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), prompt.clone(), schema.name));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::backend_failed("script exhausted")))
    }
}

/// Formatted `tracing` output at WARN and above
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(crate) fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .without_time()
            .finish()
    }

    pub(crate) fn warnings(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains("WARN"))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Serve exactly one HTTP response on a local port.
///
/// Returns the base URL (`http://127.0.0.1:PORT/v1`) and a handle resolving
/// to the raw request text the server received.
pub(crate) async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).into_owned();
                if buf.len() >= end + 4 + content_length(&head) {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reason_phrase(status),
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;

        String::from_utf8_lossy(&buf).into_owned()
    });

    (format!("http://{}/v1", addr), handle)
}
