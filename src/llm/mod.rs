pub mod openai;

use crate::error::PodgenResult;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A role-tagged message sent to the text generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Text generation backend: a message sequence in, one completion text out.
///
/// Implementations block on network I/O; callers run them sequentially.
pub trait TextGenerator: Send + Sync {
    fn complete(&self, messages: &[ChatMessage]) -> PodgenResult<String>;

    fn model_name(&self) -> &str;
}

/// Image generation backend: a prompt in, a retrievable image URL out.
pub trait ImageGenerator: Send + Sync {
    fn generate_image(&self, prompt: &str) -> PodgenResult<String>;
}
