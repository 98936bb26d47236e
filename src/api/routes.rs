/*
 * Responsibility
 * - URL 構造を定義
 * - GET / は認証なし、/slack 系だけ署名検証 middleware を route_layer で掛ける
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{health::health, slack::slack_webhook};
use crate::middleware::slack_signature;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let webhooks = Router::new()
        .route("/slack", post(slack_webhook))
        .route("/slack/events", post(slack_webhook));
    let webhooks = slack_signature::apply(webhooks, state);

    Router::new().route("/", get(health)).merge(webhooks)
}
