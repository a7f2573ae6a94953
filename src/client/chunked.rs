//! Chunked-response transport.
//!
//! One POST request whose response body is an unbounded newline-delimited
//! stream. Event-bearing lines start with the `data:` marker followed by a
//! JSON object; everything else (keep-alive blanks, comments) is ignored.
//! Chunk boundaries fall anywhere, including inside a multi-byte character,
//! so lines are reassembled from raw bytes and only decoded once complete.

use reqwest::Url;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::session::SessionGuard;
use super::TaskRequest;
use crate::events::AgentEvent;

const EVENT_MARKER: &str = "data:";

/// Reassembles newline-bounded lines from arbitrarily fragmented byte chunks
/// and yields the payload of every marker-prefixed line. The trailing
/// possibly-incomplete line stays buffered for the next chunk.
pub(crate) struct LineAccumulator {
    buffer: Vec<u8>,
}

impl LineAccumulator {
    pub(crate) fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let mut line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(rest) = line.strip_prefix(EVENT_MARKER) {
                let payload = rest.trim();
                if !payload.is_empty() {
                    payloads.push(payload.to_string());
                }
            }
        }
        payloads
    }
}

/// Parse one line payload into an event. Invalid JSON is logged and dropped;
/// it never aborts the session.
pub(crate) fn decode_line(payload: &str) -> Option<AgentEvent> {
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Some(AgentEvent::decode(value)),
        Err(e) => {
            warn!("Failed to parse stream event: {} - line: {}", e, preview(payload));
            None
        }
    }
}

fn preview(line: &str) -> String {
    if line.chars().count() > 200 {
        let head: String = line.chars().take(200).collect();
        format!("{}...", head)
    } else {
        line.to_string()
    }
}

pub(crate) async fn run_chunked_session(
    http: reqwest::Client,
    url: Url,
    request: TaskRequest,
    tx: mpsc::Sender<AgentEvent>,
    guard: SessionGuard,
) {
    drive(http, url, request, &tx).await;
    // Mark terminated before the channel closes so callers observing the
    // end of the stream always see a terminated session.
    drop(guard);
    drop(tx);
}

async fn drive(
    http: reqwest::Client,
    url: Url,
    request: TaskRequest,
    tx: &mpsc::Sender<AgentEvent>,
) {
    use futures::StreamExt;

    let response = match http.post(url).json(&request).send().await {
        Ok(r) => r,
        Err(e) => {
            let _ = tx
                .send(AgentEvent::transport_error(format!(
                    "connection failed: {}",
                    e
                )))
                .await;
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let _ = tx
            .send(AgentEvent::transport_error(format!(
                "server returned HTTP {}: {}",
                status,
                preview(&body)
            )))
            .await;
        return;
    }

    let mut stream = response.bytes_stream();
    let mut lines = LineAccumulator::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tx
                    .send(AgentEvent::transport_error(format!(
                        "stream dropped: {}",
                        e
                    )))
                    .await;
                return;
            }
        };

        for payload in lines.push(&chunk) {
            let Some(event) = decode_line(&payload) else {
                continue;
            };
            let terminal = event.is_terminal();
            if tx.send(event).await.is_err() {
                debug!("Event receiver dropped, closing stream");
                return;
            }
            if terminal {
                debug!("Terminal event observed, closing stream");
                return;
            }
        }
    }

    debug!("Stream ended without a terminal event");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode_all(chunks: &[&[u8]]) -> Vec<AgentEvent> {
        let mut acc = LineAccumulator::new();
        let mut events = Vec::new();
        for chunk in chunks {
            for payload in acc.push(chunk) {
                if let Some(event) = decode_line(&payload) {
                    events.push(event);
                }
            }
        }
        events
    }

    const STREAM: &str = concat!(
        "data: {\"type\":\"ITERATION_START\",\"iteration\":1,\"message\":\"start\"}\n",
        ": keep-alive\n",
        "data: {\"type\":\"TOOL_RESULT\",\"toolName\":\"read_file\",\"result\":\"ok\"}\n",
        "data: {\"type\":\"TASK_COMPLETE\",\"message\":\"done\"}\n",
    );

    #[test]
    fn test_unfragmented_decode() {
        let events = decode_all(&[STREAM.as_bytes()]);
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            AgentEvent::IterationStart {
                iteration: 1,
                message: "start".to_string(),
            }
        );
        assert!(events[2].is_terminal());
    }

    #[test]
    fn test_every_split_point_decodes_identically() {
        let whole = decode_all(&[STREAM.as_bytes()]);
        let bytes = STREAM.as_bytes();
        for split in 0..=bytes.len() {
            let fragmented = decode_all(&[&bytes[..split], &bytes[split..]]);
            assert_eq!(fragmented, whole, "split at byte {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time_decode() {
        let whole = decode_all(&[STREAM.as_bytes()]);
        let single: Vec<&[u8]> = STREAM.as_bytes().chunks(1).collect();
        assert_eq!(decode_all(&single), whole);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let line = "data: {\"type\":\"LOG\",\"message\":\"héllo\"}\n";
        let bytes = line.as_bytes();
        // Split inside the two-byte 'é'.
        let mid = line.find('é').unwrap() + 1;
        let events = decode_all(&[&bytes[..mid], &bytes[mid..]]);
        assert_eq!(
            events,
            vec![AgentEvent::Log {
                message: "héllo".to_string(),
            }]
        );
    }

    #[test]
    fn test_crlf_lines() {
        let events = decode_all(&[b"data: {\"type\":\"LOG\",\"message\":\"a\"}\r\n"]);
        assert_eq!(
            events,
            vec![AgentEvent::Log {
                message: "a".to_string(),
            }]
        );
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let stream = concat!(
            "data: {\"type\":\"ITERATION_START\",\"iteration\":1,\"message\":\"a\"}\n",
            "data: {bad json\n",
            "data: {\"type\":\"ITERATION_START\",\"iteration\":2,\"message\":\"b\"}\n",
        );
        let events = decode_all(&[stream.as_bytes()]);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| !e.is_terminal()));
    }

    #[test]
    fn test_non_marker_lines_ignored() {
        let events = decode_all(&[b"event: progress\n\ndata: {\"type\":\"LOG\",\"message\":\"x\"}\n"]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_trailing_fragment_is_retained() {
        let mut acc = LineAccumulator::new();
        assert!(acc.push(b"data: {\"type\":\"LOG\",").is_empty());
        let payloads = acc.push(b"\"message\":\"joined\"}\n");
        assert_eq!(payloads, vec!["{\"type\":\"LOG\",\"message\":\"joined\"}"]);
    }
}
