/*
 * Responsibility
 * - POST /slack, /slack/events
 * - 署名検証は middleware 側で済んでいる前提 (ここに来るのは検証済みの raw body)
 * - url_verification には challenge を返す
 * - slash command は dispatcher に渡してすぐ 200 を返す (結果は Slack に後から投稿)
 */
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::api::dto::slack::{AckResponse, ChallengeResponse, EventEnvelope, SlashCommand};
use crate::error::AppError;
use crate::state::AppState;

pub async fn slack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    tracing::info!("received Slack request");

    if is_json(&headers) {
        let envelope: EventEnvelope = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, "invalid Slack event payload");
            AppError::bad_request("INVALID_PAYLOAD", "invalid event payload")
        })?;

        if envelope.kind == "url_verification" {
            let challenge = envelope.challenge.unwrap_or_default();
            return Ok(Json(ChallengeResponse { challenge }).into_response());
        }

        tracing::debug!(event_type = %envelope.kind, "ignoring Slack event");
        return Ok(ack());
    }

    let command = SlashCommand::from_form(&body);

    let Some(channel_id) = command.channel_id else {
        tracing::error!("no channel_id provided in request");
        return Ok(ack());
    };

    tracing::info!(
        channel = %channel_id,
        user = command.user_id.as_deref().unwrap_or("-"),
        slash_command = command.command.as_deref().unwrap_or("-"),
        "dispatching command"
    );

    // Errors from here on are reported in the channel, never in this response.
    state.dispatcher.dispatch(command.text, channel_id);

    Ok(ack())
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

fn ack() -> Response {
    (
        StatusCode::OK,
        Json(AckResponse {
            message: "Processing request...",
        }),
    )
        .into_response()
}
