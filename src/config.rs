/*
 * Responsibility
 * - 環境変数の読み込み (Slack / GitHub / AI のトークン、ポート、開発モードなど)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - secret は Debug に出さない
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use url::Url;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_AI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<&str>) -> Self {
        match raw
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A credential loaded from the environment.
///
/// `Debug` never prints the value, so a `Config` can be logged safely.
#[derive(Clone, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret([REDACTED])")
        }
    }
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub api_url: Url,
    pub api_key: Secret,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // Skips webhook signature verification. Only ever set from the environment.
    pub development_mode: bool,
    pub slack_signing_secret: Secret,
    pub slack_bot_token: Secret,
    pub slack_api_url: Url,

    pub github_token: Secret,
    pub github_api_url: Url,
    pub repo_owner: String,
    pub repo_name: String,

    // None disables the AI commands.
    pub ai: Option<AiConfig>,

    pub command_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port: u16 = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 5000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV").as_deref());

        let development_mode = match get("DEVELOPMENT_MODE").as_deref() {
            None => false,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(ConfigError::Invalid("DEVELOPMENT_MODE")),
            },
        };

        // Unverified webhooks must never be reachable in a deployed instance.
        if development_mode && app_env.is_production() {
            return Err(ConfigError::Invalid("DEVELOPMENT_MODE"));
        }

        let slack_signing_secret = match get("SLACK_SIGNING_SECRET") {
            Some(v) => Secret::new(v),
            None if development_mode => Secret::default(),
            None => return Err(ConfigError::Missing("SLACK_SIGNING_SECRET")),
        };

        let slack_bot_token = Secret::new(require("SLACK_BOT_TOKEN")?);
        let slack_api_url =
            parse_url(get("SLACK_API_URL"), DEFAULT_SLACK_API_URL, "SLACK_API_URL")?;

        let github_token = Secret::new(require("GITHUB_TOKEN")?);
        let github_api_url =
            parse_url(get("GITHUB_API_URL"), DEFAULT_GITHUB_API_URL, "GITHUB_API_URL")?;
        let repo_owner = require("REPO_OWNER")?;
        let repo_name = require("REPO_NAME")?;

        let ai = match get("AI_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            Some(key) => Some(AiConfig {
                api_url: parse_url(get("AI_API_URL"), DEFAULT_AI_API_URL, "AI_API_URL")?,
                api_key: Secret::new(key),
                model: get("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            }),
            None => None,
        };

        let command_concurrency = match get("COMMAND_CONCURRENCY") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("COMMAND_CONCURRENCY"))?,
            None => 8,
        };

        Ok(Self {
            addr,
            app_env,
            development_mode,
            slack_signing_secret,
            slack_bot_token,
            slack_api_url,
            github_token,
            github_api_url,
            repo_owner,
            repo_name,
            ai,
            command_concurrency,
        })
    }
}

fn parse_url(raw: Option<String>, default: &str, key: &'static str) -> Result<Url, ConfigError> {
    let raw = raw.as_deref().unwrap_or(default);
    let url = Url::parse(raw).map_err(|_| ConfigError::Invalid(key))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(key));
    }
    Ok(url)
}
