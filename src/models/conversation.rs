use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Agent => write!(f, "Assistant"),
        }
    }
}

/// One entry of the append-only session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub requested_files: Vec<String>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            requested_files: Vec::new(),
        }
    }

    pub fn agent(content: impl Into<String>, requested_files: Vec<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            requested_files,
        }
    }

    /// Rendered form used when replaying the transcript into a prompt.
    pub fn render(&self) -> String {
        if self.requested_files.is_empty() {
            format!("{}: {}", self.role, self.content.trim())
        } else {
            format!(
                "{}: {}\n(requested: {})",
                self.role,
                self.content.trim(),
                self.requested_files.join(", ")
            )
        }
    }
}
