//! Outbound notification interface (posting command results back to a channel).
pub mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::SlackClient;

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("Slack API error: {0}")]
    Api(String),
    #[error("Slack API returned HTTP {0}")]
    Status(u16),
    #[error("Slack request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError>;
}
