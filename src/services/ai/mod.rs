//! Code generation / refinement through an OpenAI-compatible chat completions API.
pub mod client;

use async_trait::async_trait;
use thiserror::Error;

pub use client::ChatCompletionClient;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("AI API returned no completion")]
    EmptyCompletion,
    #[error("AI request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeTask {
    Generate,
    Refine,
}

impl CodeTask {
    pub fn system_prompt(self) -> &'static str {
        match self {
            CodeTask::Generate => {
                "You are a senior software engineer. Write the code the user asks for. \
                 Reply with a short explanation followed by the code in a fenced block."
            }
            CodeTask::Refine => {
                "You are a senior software engineer reviewing code. Improve the code the user \
                 provides for correctness, clarity and performance. Reply with the revised code \
                 in a fenced block and a brief list of the changes."
            }
        }
    }
}

#[async_trait]
pub trait CodeAssistant: Send + Sync {
    async fn complete(&self, task: CodeTask, prompt: &str) -> Result<String, AiError>;
}
