use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Hours a saved transcript stays restorable before it is discarded.
const TRANSCRIPT_TTL_HOURS: i64 = 24;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One completed turn of the conversation.
///
/// Turns are immutable once created; the ordered sequence of turns forms the
/// visible transcript. `thoughts` carries the reasoning trace attached to an
/// assistant turn when the server supplied one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            thoughts: None,
        }
    }

    pub fn assistant(text: impl Into<String>, thoughts: Option<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            thoughts,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
            thoughts: None,
        }
    }
}

/// The ordered conversation plus the instant it was last saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub saved_at: DateTime<Utc>,
    pub turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn new(turns: Vec<ChatTurn>) -> Self {
        Self {
            saved_at: Utc::now(),
            turns,
        }
    }

    /// A transcript saved more than 24 hours before `now` is not restored.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.saved_at) > Duration::hours(TRANSCRIPT_TTL_HOURS)
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
