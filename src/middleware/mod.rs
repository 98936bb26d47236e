/*
 * Responsibility
 * - middleware の公開インターフェース (re-export)
 * - http: request-id / trace / body limit / timeout
 * - slack_signature: Slack からのリクエストかを検証
 */
pub mod http;
pub mod slack_signature;
