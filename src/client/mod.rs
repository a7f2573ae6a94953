//! Task submission and event stream consumption.
//!
//! [`TaskClient`] is the HTTP implementation of [`TaskBackend`]: it submits a
//! task one-shot (`submit`), opens a chunked-response event stream
//! (`stream_task`), or subscribes to a server-push event channel
//! (`subscribe`). Both streaming modes yield the same [`StreamSession`].

mod chunked;
mod session;
mod subscribe;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::StreamError;

pub use session::StreamSession;
use session::{SessionGuard, SessionState};

/// Events buffered between the consumer task and the caller.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One task submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_path: Option<String>,
    pub use_collaboration: bool,
    /// Identifier used to key the server-push event channel.
    pub task_id: String,
}

impl TaskRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            directory_path: None,
            use_collaboration: false,
            task_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_directory(mut self, directory_path: impl Into<String>) -> Self {
        self.directory_path = Some(directory_path.into());
        self
    }

    pub fn with_collaboration(mut self, use_collaboration: bool) -> Self {
        self.use_collaboration = use_collaboration;
        self
    }
}

/// Response of the non-streaming submit path.
///
/// Superset of the shapes the backend has produced over time: the current
/// form is `{success, summary|message, details?, additionalInfo?}`; older
/// deployments returned `{agentType, reasoning, result}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub additional_info: Option<Value>,
    /// Full result text, rendered through the markdown converter.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub agent_type: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

fn default_success() -> bool {
    true
}

impl AgentResponse {
    /// The headline text: `summary` with `message` as the legacy alias.
    pub fn headline(&self) -> &str {
        self.summary
            .as_deref()
            .or(self.message.as_deref())
            .unwrap_or_default()
    }
}

/// The conceptual contract both transports and the one-shot path share:
/// open, receive events (or a single response), close.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Submit a task and await the single terminal response.
    async fn submit(&self, request: &TaskRequest) -> Result<AgentResponse, StreamError>;

    /// Submit a task and consume its progress as a chunked response stream.
    async fn stream_task(&self, request: &TaskRequest) -> Result<StreamSession, StreamError>;

    /// Subscribe to the server-push event channel for a task id.
    async fn subscribe(&self, task_id: &str) -> Result<StreamSession, StreamError>;
}

/// HTTP client for the agent backend.
pub struct TaskClient {
    http: reqwest::Client,
    config: Config,
    /// Single-session guard: holds one permit, owned by the active session.
    active: Arc<Semaphore>,
}

impl TaskClient {
    pub fn new(config: Config) -> Result<Self, StreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(StreamError::from_reqwest)?;
        Ok(Self {
            http,
            config,
            active: Arc::new(Semaphore::new(1)),
        })
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url, StreamError> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| StreamError::InvalidUrl(e.to_string()))
    }

    /// Reject a second submission while a session is in flight. The permit
    /// travels into the consumer task and is released on every exit path.
    fn acquire_session(&self) -> Result<(Arc<SessionState>, SessionGuard), StreamError> {
        let permit = Arc::clone(&self.active)
            .try_acquire_owned()
            .map_err(|_| StreamError::SessionActive)?;
        let state = Arc::new(SessionState::new());
        let guard = SessionGuard::new(Arc::clone(&state), permit);
        Ok((state, guard))
    }
}

#[async_trait]
impl TaskBackend for TaskClient {
    async fn submit(&self, request: &TaskRequest) -> Result<AgentResponse, StreamError> {
        let url = self.endpoint("/api/submit")?;
        debug!("Submitting task {} to {}", request.task_id, url);

        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(StreamError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<AgentResponse>()
            .await
            .map_err(|e| StreamError::Parse(e.to_string()))
    }

    async fn stream_task(&self, request: &TaskRequest) -> Result<StreamSession, StreamError> {
        let url = self.endpoint("/api/stream")?;
        let (state, guard) = self.acquire_session()?;
        debug!("Opening chunked stream for task {}", request.task_id);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let task = tokio::spawn(chunked::run_chunked_session(
            self.http.clone(),
            url,
            request.clone(),
            tx,
            guard,
        ));
        Ok(StreamSession::new(rx, state, task))
    }

    async fn subscribe(&self, task_id: &str) -> Result<StreamSession, StreamError> {
        let url = self.endpoint(&format!("/api/tasks/{}/events", task_id))?;
        let (state, guard) = self.acquire_session()?;
        debug!("Subscribing to event channel for task {}", task_id);

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let task = tokio::spawn(subscribe::run_subscribe_session(
            self.http.clone(),
            url,
            tx,
            guard,
        ));
        Ok(StreamSession::new(rx, state, task))
    }
}
