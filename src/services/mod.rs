/*
 * Responsibility
 * - 外部 API (GitHub / Slack / AI) のクライアントと trait
 * - Slack 署名検証 (signature)
 * - コマンドの解釈と非同期実行 (commands)
 */
pub mod ai;
pub mod commands;
pub mod github;
pub mod signature;
pub mod slack;
