/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - ex: verifier: SignatureVerifier, dispatcher: CommandDispatcher
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::{commands::CommandDispatcher, signature::SignatureVerifier};

#[derive(Clone, Debug)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub dispatcher: Arc<CommandDispatcher>,
}

impl AppState {
    pub fn new(verifier: Arc<SignatureVerifier>, dispatcher: Arc<CommandDispatcher>) -> Self {
        Self {
            verifier,
            dispatcher,
        }
    }
}
