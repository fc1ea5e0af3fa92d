//! Streaming client for the upstream `POST /api/pull` protocol.
//!
//! The upstream answers with newline-delimited JSON records, one per progress
//! step. Records are read as they arrive, handed to the caller's callback on the
//! same task, and the first status containing `success` ends the pull without
//! waiting for the upstream to close the stream.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::value_text;
use crate::upstream::OllamaClient;

const SUCCESS_MARKER: &str = "success";

/// Default overall deadline for a pull.
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullProgressEvent {
    pub status: String,
    pub is_terminal: bool,
    pub is_error: bool,
    pub completed: Option<u64>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Success,
    UpstreamFailure { status: u16, body: String },
    TransportFailure { message: String },
}

impl PullOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PullOutcome::Success)
    }
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

/// One pull against the upstream. Consumed by [`StreamingPullClient::pull`].
pub struct StreamingPullClient {
    http_client: Client,
    url: String,
    deadline: Duration,
}

impl StreamingPullClient {
    pub fn new(upstream: &OllamaClient, deadline: Duration) -> Self {
        Self {
            http_client: upstream.http_client().clone(),
            url: upstream.url("/api/pull"),
            deadline,
        }
    }

    /// Run the pull to completion, reporting each parsed record to `on_progress`.
    ///
    /// The callback runs inline with the read loop, so a slow callback slows the
    /// read. When the deadline expires the in-flight request is dropped and
    /// `TransportFailure("timeout")` is returned.
    pub async fn pull<F>(self, model: &str, mut on_progress: F) -> PullOutcome
    where
        F: FnMut(PullProgressEvent),
    {
        info!("Starting to pull model: {}", model);
        match tokio::time::timeout(self.deadline, self.stream(model, &mut on_progress)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Pull of {} exceeded {:?}", model, self.deadline);
                PullOutcome::TransportFailure { message: "timeout".to_string() }
            }
        }
    }

    async fn stream<F>(&self, model: &str, on_progress: &mut F) -> PullOutcome
    where
        F: FnMut(PullProgressEvent),
    {
        let response = match self.http_client
            .post(&self.url)
            .json(&PullRequest { name: model, stream: true })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_failure(e),
        };

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => return transport_failure(e),
            };
            warn!("Pull of {} rejected by upstream: {} - {}", model, status, body);
            return PullOutcome::UpstreamFailure { status: status.as_u16(), body };
        }

        let mut lines = LineBuffer::default();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return transport_failure(e),
            };
            lines.push(&chunk);
            while let Some(line) = lines.next_line() {
                if handle_line(&line, on_progress) {
                    info!("Pull of {} reported success", model);
                    return PullOutcome::Success;
                }
            }
        }

        if let Some(line) = lines.finish() {
            if handle_line(&line, on_progress) {
                info!("Pull of {} reported success", model);
                return PullOutcome::Success;
            }
        }

        // No explicit error from the upstream; accepted as a completed pull.
        warn!("Pull stream for {} ended without a success marker, treating as success", model);
        PullOutcome::Success
    }
}

fn transport_failure(err: reqwest::Error) -> PullOutcome {
    let message = if err.is_timeout() {
        "timeout".to_string()
    } else {
        err.to_string()
    };
    warn!("Pull transport failure: {}", message);
    PullOutcome::TransportFailure { message }
}

/// Report one record. Returns true when it carried the success marker.
fn handle_line<F>(line: &[u8], on_progress: &mut F) -> bool
where
    F: FnMut(PullProgressEvent),
{
    let Some(record) = parse_line(line) else {
        return false;
    };

    if let Some(error) = record.error {
        on_progress(PullProgressEvent {
            status: error,
            is_terminal: false,
            is_error: true,
            completed: None,
            total: None,
        });
    }

    match record.status {
        Some(status) => {
            let is_terminal = status.contains(SUCCESS_MARKER);
            debug!("Pull progress: {}", status);
            on_progress(PullProgressEvent {
                status,
                is_terminal,
                is_error: false,
                completed: record.completed,
                total: record.total,
            });
            is_terminal
        }
        None => false,
    }
}

#[derive(Debug, Default, PartialEq)]
struct ProgressRecord {
    status: Option<String>,
    error: Option<String>,
    completed: Option<u64>,
    total: Option<u64>,
}

/// Decode one line. Blank lines, invalid JSON and non-object values yield `None`.
fn parse_line(line: &[u8]) -> Option<ProgressRecord> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_slice(line) {
        Ok(value) => value,
        Err(e) => {
            debug!("Skipping malformed pull line ({}): {}", e, String::from_utf8_lossy(line));
            return None;
        }
    };
    let object = value.as_object()?;
    let text = |key: &str| {
        object
            .get(key)
            .and_then(value_text)
            .filter(|s| !s.is_empty())
    };

    Some(ProgressRecord {
        status: text("status"),
        error: text("error"),
        completed: object.get("completed").and_then(Value::as_u64),
        total: object.get("total").and_then(Value::as_u64),
    })
}

/// Reassembles newline-terminated records from arbitrarily split chunks.
#[derive(Default)]
struct LineBuffer {
    buf: BytesMut,
    scanned: usize,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<Bytes> {
        match self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let line = self.buf.split_to(self.scanned + offset + 1);
                self.scanned = 0;
                Some(line.freeze())
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Whatever is left once the stream has ended.
    fn finish(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.split().freeze())
        }
    }
}
