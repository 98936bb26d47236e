//! In-memory stand-ins for the upstream services, shared by unit tests.
use std::sync::Mutex;

use async_trait::async_trait;

use crate::services::ai::{AiError, CodeAssistant, CodeTask};
use crate::services::github::{Branch, GitHubError, GitHubResult, SourceControl};
use crate::services::slack::{Notifier, SlackError};

#[derive(Default)]
pub struct FakeScm {
    pub branches: Vec<Branch>,
    pub fail_with: Mutex<Option<GitHubError>>,
    pub deleted: Mutex<Vec<String>>,
}

impl FakeScm {
    pub fn failing(err: GitHubError) -> Self {
        Self {
            fail_with: Mutex::new(Some(err)),
            ..Default::default()
        }
    }

    fn take_failure(&self) -> Option<GitHubError> {
        self.fail_with.lock().unwrap().take()
    }
}

#[async_trait]
impl SourceControl for FakeScm {
    async fn create_branch(&self, _name: &str) -> GitHubResult<String> {
        match self.take_failure() {
            Some(err) => Err(err),
            None => Ok("main".to_string()),
        }
    }

    async fn list_branches(&self) -> GitHubResult<Vec<Branch>> {
        match self.take_failure() {
            Some(err) => Err(err),
            None => Ok(self.branches.clone()),
        }
    }

    async fn delete_branch(&self, name: &str) -> GitHubResult<()> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

pub struct EchoAssistant;

#[async_trait]
impl CodeAssistant for EchoAssistant {
    async fn complete(&self, task: CodeTask, prompt: &str) -> Result<String, AiError> {
        Ok(format!("{task:?}: {prompt}"))
    }
}

pub struct BrokenAssistant;

#[async_trait]
impl CodeAssistant for BrokenAssistant {
    async fn complete(&self, _task: CodeTask, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::EmptyCompletion)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        if self.fail {
            return Err(SlackError::Api("channel_not_found".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }
}
