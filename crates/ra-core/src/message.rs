use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Split a leading `<think>...</think>` block off a model answer.
///
/// Returns the remaining content and the extracted reasoning, if any. Some
/// reasoning models drop the opening tag, so text before a lone closing tag
/// counts as reasoning, but only when no JSON has started yet. Tags that appear
/// later in the answer are left alone.
pub fn strip_thinking_tags(content: &str) -> (String, Option<String>) {
    let untouched = || (content.to_string(), None);

    let (thinking, rest) = match content.trim_start().strip_prefix(THINK_OPEN) {
        Some(body) => match body.split_once(THINK_CLOSE) {
            Some(parts) => parts,
            None => return untouched(),
        },
        None => match content.split_once(THINK_CLOSE) {
            Some((before, rest)) if !before.contains('{') && !before.contains(THINK_OPEN) => {
                (before, rest)
            }
            _ => return untouched(),
        },
    };

    let thinking = thinking.trim();
    let thinking = if thinking.is_empty() {
        None
    } else {
        Some(thinking.to_string())
    };

    (rest.trim().to_string(), thinking)
}
