//! Stream session lifecycle.
//!
//! One [`StreamSession`] covers one task submission: the consumer task is
//! spawned with a [`SessionGuard`] that marks the session terminated and
//! releases the client's single-session permit on every exit path, including
//! abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::events::AgentEvent;

/// Shared flag set once the consumer task has closed the transport.
pub(crate) struct SessionState {
    terminated: AtomicBool,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            terminated: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

/// Owned by the consumer task. Dropping it — normal return, transport error,
/// or task abort — marks the session terminated and frees the permit.
pub(crate) struct SessionGuard {
    state: Arc<SessionState>,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    pub(crate) fn new(state: Arc<SessionState>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            state,
            _permit: permit,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.terminated.store(true, Ordering::SeqCst);
        debug!("stream session terminated");
    }
}

/// One active consumption of an event stream for one submitted task.
///
/// Events arrive in exact wire order. The session ends when a terminal event
/// is delivered, the transport closes, or [`StreamSession::stop`] is called.
pub struct StreamSession {
    events: mpsc::Receiver<AgentEvent>,
    state: Arc<SessionState>,
    task: JoinHandle<()>,
    stopped: bool,
}

impl StreamSession {
    pub(crate) fn new(
        events: mpsc::Receiver<AgentEvent>,
        state: Arc<SessionState>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            state,
            task,
            stopped: false,
        }
    }

    /// Next event, in arrival order. Returns `None` once the stream is
    /// exhausted or the session was stopped.
    pub async fn next_event(&mut self) -> Option<AgentEvent> {
        if self.stopped {
            return None;
        }
        self.events.recv().await
    }

    /// Cancel the session. Closes the transport and discards any
    /// not-yet-delivered events. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.task.abort();
    }

    /// Whether the consumer has closed the transport.
    pub fn is_terminated(&self) -> bool {
        self.stopped || self.state.is_terminated()
    }

    /// Adapt the session into a `futures::Stream` of events.
    pub fn into_stream(mut self) -> impl Stream<Item = AgentEvent> {
        async_stream::stream! {
            while let Some(event) = self.next_event().await {
                yield event;
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}
