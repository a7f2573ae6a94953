//! Server-push transport.
//!
//! Long-lived SSE subscription keyed by task id. Each inbound message body is
//! one complete JSON payload, so no line reassembly is needed. The session
//! never reconnects: any transport failure ends it with a single synthesized
//! error event.

use futures::StreamExt;
use reqwest::Url;
use reqwest_eventsource::{Error as SseError, Event, EventSource};
use tokio::sync::mpsc;
use tracing::debug;

use super::chunked::decode_line;
use super::session::SessionGuard;
use crate::events::AgentEvent;

pub(crate) async fn run_subscribe_session(
    http: reqwest::Client,
    url: Url,
    tx: mpsc::Sender<AgentEvent>,
    guard: SessionGuard,
) {
    drive(http, url, &tx).await;
    drop(guard);
    drop(tx);
}

async fn drive(http: reqwest::Client, url: Url, tx: &mpsc::Sender<AgentEvent>) {
    let mut source = match EventSource::new(http.get(url)) {
        Ok(s) => s,
        Err(e) => {
            let _ = tx
                .send(AgentEvent::transport_error(format!(
                    "failed to open event channel: {}",
                    e
                )))
                .await;
            return;
        }
    };

    while let Some(item) = source.next().await {
        match item {
            Ok(Event::Open) => {
                debug!("Event channel open");
            }
            Ok(Event::Message(message)) => {
                let Some(event) = decode_line(&message.data) else {
                    continue;
                };
                let terminal = event.is_terminal();
                if tx.send(event).await.is_err() {
                    debug!("Event receiver dropped, closing channel");
                    source.close();
                    return;
                }
                if terminal {
                    debug!("Terminal event observed, closing channel");
                    source.close();
                    return;
                }
            }
            Err(SseError::StreamEnded) => {
                debug!("Event channel closed by server");
                source.close();
                return;
            }
            Err(e) => {
                let _ = tx
                    .send(AgentEvent::transport_error(format!(
                        "event channel failed: {}",
                        e
                    )))
                    .await;
                source.close();
                return;
            }
        }
    }
}
