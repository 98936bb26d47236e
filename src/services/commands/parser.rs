//! Slash-command text → `Command`.
//!
//! The first whitespace-separated token selects the command; the rest of the
//! text is its argument.

use crate::services::github::is_valid_branch_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateBranch(String),
    ListBranches,
    DeleteBranch(String),
    GenerateCode(String),
    RefineCode(String),
    Help,
    /// Recognised command with a missing or malformed argument.
    Usage(&'static str),
    Unknown(String),
}

const INVALID_BRANCH_NAME: &str =
    "❌ Invalid branch name. Use letters, digits, `-`, `_`, `.` and `/` (no `..`).";

pub const HELP_TEXT: &str = "Available commands:\n\
• create-branch <branch-name>\n\
• list-branches\n\
• delete-branch <branch-name>\n\
• generate-code <description>\n\
• refine-code <code or instructions>\n\
• help";

impl Command {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (name, rest) = match text.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (text, ""),
        };

        match name {
            "create-branch" => branch_command(
                rest,
                "❌ Please provide a branch name: `/command create-branch branch-name`",
                Command::CreateBranch,
            ),
            "delete-branch" => branch_command(
                rest,
                "❌ Please provide a branch name: `/command delete-branch branch-name`",
                Command::DeleteBranch,
            ),
            "list-branches" if rest.is_empty() => Command::ListBranches,
            "generate-code" if !rest.is_empty() => Command::GenerateCode(rest.to_string()),
            "generate-code" => Command::Usage(
                "❌ Please describe the code to generate: `/command generate-code <description>`",
            ),
            "refine-code" if !rest.is_empty() => Command::RefineCode(rest.to_string()),
            "refine-code" => Command::Usage(
                "❌ Please provide the code to refine: `/command refine-code <code>`",
            ),
            "help" | "" => Command::Help,
            _ => Command::Unknown(text.to_string()),
        }
    }

    /// Short label for logs. Never includes the free-text argument.
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateBranch(_) => "create-branch",
            Command::ListBranches => "list-branches",
            Command::DeleteBranch(_) => "delete-branch",
            Command::GenerateCode(_) => "generate-code",
            Command::RefineCode(_) => "refine-code",
            Command::Help => "help",
            Command::Usage(_) => "usage",
            Command::Unknown(_) => "unknown",
        }
    }
}

// A branch name is a single token that is also a valid ref name.
fn branch_command(rest: &str, usage: &'static str, build: fn(String) -> Command) -> Command {
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return Command::Usage(usage);
    }
    if !is_valid_branch_name(rest) {
        return Command::Usage(INVALID_BRANCH_NAME);
    }
    build(rest.to_string())
}
