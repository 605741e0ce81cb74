use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Opaque platform user identifier (e.g. Slack `U024BE7LH`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyUserId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Auto-reply settings for a single user. One record per `user_id`; writes replace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfiguration {
    pub user_id: UserId,
    pub reply_message: String,
}

impl UserConfiguration {
    pub fn new(user_id: UserId, reply_message: impl Into<String>) -> Self {
        Self { user_id, reply_message: reply_message.into() }
    }

    /// Builds a configuration from raw command input. Whitespace-only text is rejected; any
    /// other text is kept verbatim.
    pub fn from_command_text(user_id: UserId, text: &str) -> Result<Self, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::EmptyReplyMessage);
        }
        Ok(Self::new(user_id, text))
    }
}
