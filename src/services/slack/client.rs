use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Secret;
use crate::services::slack::{Notifier, SlackError};

/// Slack Web API client (`chat.postMessage` only).
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    post_message_url: String,
    token: Secret,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("post_message_url", &self.post_message_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

// Slack answers HTTP 200 for most failures and reports them in the body.
#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackClient {
    pub fn new(http: reqwest::Client, api_url: &Url, token: Secret) -> Self {
        let post_message_url = format!(
            "{}/chat.postMessage",
            api_url.as_str().trim_end_matches('/')
        );
        Self {
            http,
            post_message_url,
            token,
        }
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        let res = self
            .http
            .post(&self.post_message_url)
            .bearer_auth(self.token.expose())
            .json(&PostMessageRequest { channel, text })
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(SlackError::Status(res.status().as_u16()));
        }

        let body: PostMessageResponse = res.json().await?;
        if !body.ok {
            return Err(SlackError::Api(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        debug!(channel, "posted message to Slack");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    fn client(server: &MockServer) -> SlackClient {
        let url = Url::parse(&server.uri()).unwrap();
        SlackClient::new(reqwest::Client::new(), &url, Secret::new("xoxb-test"))
    }

    #[tokio::test]
    async fn posts_message_with_bot_token() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/chat.postMessage"))
            .and(matchers::header("Authorization", "Bearer xoxb-test"))
            .and(matchers::body_json(json!({"channel": "C1", "text": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).post_message("C1", "hi").await.unwrap();
    }

    #[tokio::test]
    async fn reports_api_error_from_body() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "error": "channel_not_found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).post_message("C404", "hi").await.unwrap_err();
        assert!(matches!(err, SlackError::Api(ref e) if e == "channel_not_found"));
    }

    #[tokio::test]
    async fn reports_http_status_failures() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).post_message("C1", "hi").await.unwrap_err();
        assert!(matches!(err, SlackError::Status(500)));
    }
}
