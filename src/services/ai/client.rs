use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AiConfig;
use crate::services::ai::{AiError, CodeAssistant, CodeTask};

#[derive(Clone)]
pub struct ChatCompletionClient {
    http: reqwest::Client,
    completions_url: String,
    config: AiConfig,
}

impl std::fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("completions_url", &self.completions_url)
            .field("model", &self.config.model)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(http: reqwest::Client, config: AiConfig) -> Self {
        let completions_url = format!(
            "{}/chat/completions",
            config.api_url.as_str().trim_end_matches('/')
        );
        Self {
            http,
            completions_url,
            config,
        }
    }
}

#[async_trait]
impl CodeAssistant for ChatCompletionClient {
    async fn complete(&self, task: CodeTask, prompt: &str) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: task.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        debug!(model = %self.config.model, ?task, "requesting chat completion");

        let res = self
            .http
            .post(&self.completions_url)
            .bearer_auth(self.config.api_key.expose())
            .json(&request)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = res.text().await.unwrap_or_default();
            return Err(AiError::Api { status, message });
        }

        let body: ChatResponse = res.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(AiError::EmptyCompletion)
    }
}
