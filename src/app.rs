/*
 * Responsibility
 * - Config 読み込み → 依存生成 (GitHub / Slack / AI クライアント、dispatcher) → Router 組み立て
 * - Middleware の適用 (request-id / trace / 署名検証など)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc, time::Duration};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::services::{
    ai::{ChatCompletionClient, CodeAssistant},
    commands::CommandDispatcher,
    github::GitHubClient,
    signature::SignatureVerifier,
    slack::SlackClient,
};
use crate::state::AppState;

// Upper bound for a single outbound API call (GitHub / Slack / AI).
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,slack_git_relay=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Surface panics via tracing; stderr can be hidden depending on how the process runs.
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "refusing to start: configuration error");
    })?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting relay in {:?} mode on {} for {}/{}",
        config.app_env,
        config.addr,
        config.repo_owner,
        config.repo_name
    );

    let state = build_state(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    // One HTTP connection pool shared by every outbound client.
    let http = reqwest::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()?;

    let github = GitHubClient::new(
        http.clone(),
        &config.github_api_url,
        &config.repo_owner,
        &config.repo_name,
        config.github_token.clone(),
    );

    let slack = SlackClient::new(
        http.clone(),
        &config.slack_api_url,
        config.slack_bot_token.clone(),
    );

    let assistant = config.ai.clone().map(|ai| {
        tracing::info!(model = %ai.model, "AI commands enabled");
        Arc::new(ChatCompletionClient::new(http.clone(), ai)) as Arc<dyn CodeAssistant>
    });
    if assistant.is_none() {
        tracing::info!("no AI API key configured; AI commands disabled");
    }

    let dispatcher = CommandDispatcher::new(
        Arc::new(github),
        assistant,
        Arc::new(slack),
        config.command_concurrency,
    );

    let verifier = SignatureVerifier::new(
        config.slack_signing_secret.clone(),
        config.development_mode,
    );
    if verifier.is_bypassed() {
        tracing::warn!(
            "DEVELOPMENT_MODE is enabled: Slack signature verification is DISABLED. \
             Never run this configuration on a reachable host."
        );
    }

    Ok(AppState::new(Arc::new(verifier), Arc::new(dispatcher)))
}

fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(api::routes(state.clone()))
        .with_state(state);

    middleware::http::apply(router)
}
