use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::services::ai::{CodeAssistant, CodeTask};
use crate::services::commands::parser::{Command, HELP_TEXT};
use crate::services::github::{GitHubError, SourceControl};
use crate::services::slack::Notifier;

// The default branches are never deleted from chat.
const PROTECTED_BRANCHES: [&str; 2] = ["main", "master"];

/// Runs slash commands against upstream services and posts the result.
///
/// `dispatch` hands work to a detached tokio task so the webhook can answer
/// immediately. A semaphore bounds how many commands talk to upstream APIs
/// at once; extra tasks wait for a permit.
pub struct CommandDispatcher {
    scm: Arc<dyn SourceControl>,
    assistant: Option<Arc<dyn CodeAssistant>>,
    notifier: Arc<dyn Notifier>,
    permits: Arc<Semaphore>,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("ai_enabled", &self.assistant.is_some())
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl CommandDispatcher {
    pub fn new(
        scm: Arc<dyn SourceControl>,
        assistant: Option<Arc<dyn CodeAssistant>>,
        notifier: Arc<dyn Notifier>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            scm,
            assistant,
            notifier,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Fire-and-forget: run `text` and post the outcome to `channel`.
    ///
    /// The returned handle is only awaited by tests.
    pub fn dispatch(self: &Arc<Self>, text: String, channel: String) -> JoinHandle<()> {
        let job_id = Uuid::new_v4();
        let span = info_span!("command", %job_id, channel = %channel);
        let this = Arc::clone(self);

        tokio::spawn(
            async move {
                let _permit = match this.permits.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("command queue closed; dropping command");
                        return;
                    }
                };

                let command = Command::parse(&text);
                info!(command = command.name(), "processing command");

                let reply = this.execute(command).await;

                if let Err(err) = this.notifier.post_message(&channel, &reply).await {
                    error!(error = %err, "failed to post command result");
                }
            }
            .instrument(span),
        )
    }

    /// Run a parsed command and render the user-facing reply.
    ///
    /// Upstream failures become a `❌` message; nothing here returns an error.
    pub async fn execute(&self, command: Command) -> String {
        match command {
            Command::CreateBranch(name) => match self.scm.create_branch(&name).await {
                Ok(_) => format!("✅ Branch '{name}' created successfully"),
                Err(GitHubError::Rejected(message)) => {
                    format!("❌ Error creating branch: {message}")
                }
                Err(err) => scm_failure("create-branch", err),
            },
            Command::ListBranches => match self.scm.list_branches().await {
                Ok(branches) if branches.is_empty() => {
                    "No branches found in the repository.".to_string()
                }
                Ok(branches) => {
                    let lines: Vec<String> = branches
                        .iter()
                        .map(|b| format!("• {} ({})", b.name, b.short_sha()))
                        .collect();
                    format!("Repository branches:\n{}", lines.join("\n"))
                }
                Err(err) => scm_failure("list-branches", err),
            },
            Command::DeleteBranch(name) => {
                if PROTECTED_BRANCHES.contains(&name.as_str()) {
                    return format!("❌ Refusing to delete protected branch '{name}'");
                }
                match self.scm.delete_branch(&name).await {
                    Ok(()) => format!("✅ Branch '{name}' deleted"),
                    Err(err) => scm_failure("delete-branch", err),
                }
            }
            Command::GenerateCode(prompt) => self.ask(CodeTask::Generate, &prompt).await,
            Command::RefineCode(prompt) => self.ask(CodeTask::Refine, &prompt).await,
            Command::Help => HELP_TEXT.to_string(),
            Command::Usage(hint) => hint.to_string(),
            Command::Unknown(_) => format!("❌ Unknown command. {HELP_TEXT}"),
        }
    }

    async fn ask(&self, task: CodeTask, prompt: &str) -> String {
        let Some(assistant) = &self.assistant else {
            return "❌ AI commands are not configured".to_string();
        };
        match assistant.complete(task, prompt).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "AI completion failed");
                format!("❌ Error: {err}")
            }
        }
    }
}

// Expected GitHub outcomes read as plain messages; everything else is an error.
fn scm_failure(operation: &'static str, err: GitHubError) -> String {
    match err {
        GitHubError::NoBaseBranch
        | GitHubError::AlreadyExists(_)
        | GitHubError::NotFound(_)
        | GitHubError::InvalidName(_) => {
            info!(operation, reason = %err, "branch operation declined");
            format!("❌ {err}")
        }
        err => {
            warn!(operation, error = %err, "GitHub call failed");
            format!("❌ Error: {err}")
        }
    }
}
