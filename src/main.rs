//! taskstream - console entry point
//!
//! Submits one task and renders its progress cards to stdout.

use taskstream::client::{TaskBackend, TaskClient, TaskRequest};
use taskstream::config::Config;
use taskstream::render::{self, Transcript};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskstream=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    info!("Using backend at {}", config.base_url);

    let mut args = std::env::args().skip(1);
    let prompt = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: taskstream <prompt> [directory]"))?;
    let mut request = TaskRequest::new(prompt);
    if let Some(directory) = args.next() {
        request = request.with_directory(directory);
    }

    let streaming = config.streaming;
    let client = TaskClient::new(config)?;

    if streaming {
        let mut session = client.stream_task(&request).await?;
        let mut transcript = Transcript::new();

        // One card per event, printed as soon as it is delivered.
        while let Some(event) = session.next_event().await {
            println!("{}", transcript.push(&event));
        }
        info!("Session finished with {} cards", transcript.len());
    } else {
        let response = client.submit(&request).await?;
        println!("{}", render::render_response(&response));
    }

    Ok(())
}
