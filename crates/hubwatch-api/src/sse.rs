//! Server-Sent-Events push stream with auto-reconnect.
//!
//! Connects to the event endpoint and streams each JSON payload through a
//! [`tokio::sync::broadcast`] channel. Reconnects with exponential backoff
//! and jitter, resuming from the last seen event id when the server sent one.
//!
//! # Example
//!
//! ```rust,ignore
//! use hubwatch_api::sse::{SseHandle, ReconnectConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let handle = SseHandle::spawn(http, sse_url, headers, ReconnectConfig::default(), cancel.clone());
//! let mut rx = handle.subscribe();
//!
//! while let Ok(payload) = rx.recv().await {
//!     println!("{payload}");
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── SseHandle ────────────────────────────────────────────────────────

/// Handle to a running push stream.
pub struct SseHandle {
    event_rx: broadcast::Receiver<Arc<Value>>,
    cancel: CancellationToken,
}

impl SseHandle {
    /// Spawn the reconnection loop. The first connection attempt happens
    /// asynchronously; subscribe to start consuming payloads.
    ///
    /// `http` should be built without a request timeout (see
    /// [`TransportConfig::streaming`](crate::transport::TransportConfig::streaming)).
    pub fn spawn(
        http: reqwest::Client,
        url: Url,
        headers: HeaderMap,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (event_tx, event_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            sse_loop(http, url, headers, event_tx, reconnect, task_cancel).await;
        });

        Self { event_rx, cancel }
    }

    /// Get a new broadcast receiver for the payload stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Value>> {
        self.event_rx.resubscribe()
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

async fn sse_loop(
    http: reqwest::Client,
    url: Url,
    headers: HeaderMap,
    event_tx: broadcast::Sender<Arc<Value>>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    let mut last_event_id: Option<String> = None;

    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&http, &url, &headers, &event_tx, &cancel, &mut last_event_id) => result,
        };

        match result {
            Ok(()) => {
                if cancel.is_cancelled() {
                    break;
                }
                tracing::info!("event stream ended, reconnecting");
                attempt = 0;
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(reconnect.initial_delay) => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "event stream error");

                if let Some(max) = reconnect.max_retries {
                    if attempt >= max {
                        tracing::error!(
                            max_retries = max,
                            "event stream reconnection limit reached, giving up"
                        );
                        break;
                    }
                }

                let delay = calculate_backoff(attempt, &reconnect);
                tracing::info!(
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "waiting before reconnect"
                );

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }

                attempt = attempt.saturating_add(1);
            }
        }
    }

    tracing::debug!("event stream loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

async fn connect_and_read(
    http: &reqwest::Client,
    url: &Url,
    headers: &HeaderMap,
    event_tx: &broadcast::Sender<Arc<Value>>,
    cancel: &CancellationToken,
    last_event_id: &mut Option<String>,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to event stream");

    let mut request = http
        .get(url.clone())
        .headers(headers.clone())
        .header(ACCEPT, HeaderValue::from_static("text/event-stream"));
    if let Some(id) = last_event_id.as_deref() {
        request = request.header("Last-Event-ID", id);
    }

    let resp = request.send().await?;
    if !resp.status().is_success() {
        return Err(Error::Stream(format!("HTTP {}", resp.status())));
    }

    tracing::info!("event stream connected");

    let mut body = std::pin::pin!(resp.bytes_stream());
    let mut parser = SseParser::default();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            chunk = body.next() => match chunk {
                Some(Ok(bytes)) => {
                    for frame in parser.feed(&bytes) {
                        if let Some(id) = frame.id.clone() {
                            *last_event_id = Some(id);
                        }
                        broadcast_frame(&frame, event_tx);
                    }
                }
                Some(Err(e)) => return Err(Error::Stream(e.to_string())),
                None => return Ok(()),
            }
        }
    }
}

// ── Frame parsing ────────────────────────────────────────────────────

/// One dispatched SSE message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Incremental `text/event-stream` parser.
///
/// Bytes may arrive split anywhere, including inside a UTF-8 sequence;
/// only complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseParser {
    /// Feed a chunk and return every frame completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(frame) = self.dispatch() {
                    frames.push(frame);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_owned()),
                "data" => self.data.push(value.to_owned()),
                "id" => self.id = Some(value.to_owned()),
                _ => {}
            }
        }

        frames
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, data, id })
    }
}

/// Parse a frame's JSON data and broadcast it. Arrays fan out per element.
fn broadcast_frame(frame: &SseFrame, event_tx: &broadcast::Sender<Arc<Value>>) {
    if frame.event.as_deref() == Some("keepalive") {
        tracing::trace!("event stream keepalive");
        return;
    }

    let payload: Value = match serde_json::from_str(&frame.data) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "dropping non-JSON event stream frame");
            return;
        }
    };

    match payload {
        Value::Array(items) => {
            for item in items {
                let _ = event_tx.send(Arc::new(item));
            }
        }
        other => {
            // No subscribers is not an error.
            let _ = event_tx.send(Arc::new(other));
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`, jitter within +-25%.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic jitter seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    Duration::from_secs_f64((capped * jitter_factor).max(0.0))
}

// ── Tests ────────────────────────────────────────────────────────────
