use serde::{Deserialize, Serialize};

/// Fields we read from a slash-command form post.
///
/// Slack sends many more (team_id, user_id, response_url, ...); they are ignored.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SlashCommand {
    pub command: Option<String>,
    pub text: String,
    pub channel_id: Option<String>,
    pub user_id: Option<String>,
}

impl SlashCommand {
    pub fn from_form(raw: &[u8]) -> Self {
        let mut out = SlashCommand::default();
        for (key, value) in url::form_urlencoded::parse(raw) {
            match key.as_ref() {
                "command" => out.command = Some(value.into_owned()),
                "text" => out.text = value.trim().to_string(),
                "channel_id" => {
                    out.channel_id = Some(value.into_owned()).filter(|v| !v.is_empty())
                }
                "user_id" => out.user_id = Some(value.into_owned()),
                _ => {}
            }
        }
        out
    }
}

/// JSON envelope of the Events API. Only `url_verification` is acted on.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub challenge: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub message: &'static str,
}
