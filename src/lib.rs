//! # taskstream
//!
//! Client for submitting coding-agent tasks to a backend and consuming their
//! progress as a stream of events.
//!
//! This library provides:
//! - A task client with one-shot, chunked-response and server-push modes
//! - An ordered event stream per submission, normalized to one schema
//! - HTML card rendering with enforced escaping, plus a best-effort
//!   markdown converter for complete results
//!
//! ## Task Flow
//! 1. Submit a task via [`client::TaskClient`]
//! 2. Consume ordered [`events::AgentEvent`]s from the [`client::StreamSession`]
//! 3. Append one rendered card per event to a [`render::Transcript`]
//! 4. A terminal event (completion or error) closes the transport
//!
//! ## Modules
//! - `client`: task submission and the two stream transports
//! - `events`: event model and wire-format normalization
//! - `render`: card rendering, transcript, markdown conversion
//! - `config`: environment-driven configuration

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod render;

pub use client::{AgentResponse, StreamSession, TaskBackend, TaskClient, TaskRequest};
pub use config::Config;
pub use error::StreamError;
pub use events::AgentEvent;
pub use render::Transcript;
