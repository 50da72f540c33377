use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message, in the vocabulary of chat-completion APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// A single utterance in the classroom.
///
/// Messages are values: agents and the orchestrator hand around clones, so a
/// message never changes once it has been recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Speaker label such as `Teacher` or `Student-2`.
    pub name: Option<String>,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            name: None,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            name: None,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            name: None,
            content: content.into(),
        }
    }

    /// Attaches a speaker label.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Speaker labels used across the adapters.
pub mod speaker {
    pub const TEACHER: &str = "Teacher";
    pub const SUPPORTER: &str = "Supporter";
    pub const SUMMARIZER: &str = "Summarizer";
    pub const STUDENT: &str = "Student";

    /// Label for the student at `index` in the pool (1-based in the label).
    pub fn student(index: usize) -> String {
        format!("{STUDENT}-{}", index + 1)
    }
}
