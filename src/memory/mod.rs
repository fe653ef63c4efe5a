//! Conversation memory: the append-only turn store shared across requests.
//!
//! One `ConversationMemory` lives for the whole process. Requests append a
//! user turn before generation starts and an assistant turn when a stream
//! completes; readers take owned snapshots that later appends or clears
//! cannot invalidate.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ChatError;

// ============================================================================
// Roles and turns
// ============================================================================

/// Who produced a turn. Closed set: anything else is rejected at the
/// string boundary with `ChatError::InvalidRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(ChatError::InvalidRole(other.to_string())),
        }
    }
}

/// One recorded message. Immutable after commit; removed only by `clear`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub recorded_at: DateTime<Utc>,
}

// ============================================================================
// Memory store
// ============================================================================

/// Process-wide conversation history behind a single mutex.
///
/// All mutation goes through `append` and `clear`; the inner vec is never
/// exposed by reference. Critical sections are a push, a clone, or a clear —
/// no lock is ever held across an await.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Mutex<Vec<Turn>>,
}

impl ConversationMemory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Empty content is accepted; callers decide whether an
    /// empty assistant turn is worth committing.
    ///
    /// A poisoned lock propagates as `ChatError::MemoryPoisoned` — on the
    /// write path we fail loudly rather than drop a turn on the floor.
    pub fn append(&self, role: Role, content: impl Into<String>) -> Result<(), ChatError> {
        let mut turns = self.turns.lock().map_err(|_| ChatError::MemoryPoisoned)?;
        turns.push(Turn {
            role,
            content: content.into(),
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    /// Owned copy of the full ordered history.
    ///
    /// The snapshot is detached: appends or clears after this call do not
    /// affect it. Read failures degrade to an empty history instead of
    /// taking the process down.
    pub fn snapshot(&self) -> Vec<Turn> {
        match self.turns.lock() {
            Ok(turns) => turns.clone(),
            Err(e) => {
                warn!("conversation memory read failed, returning empty history: {e}");
                Vec::new()
            }
        }
    }

    /// Drop the entire history. Snapshots taken earlier remain valid.
    pub fn clear(&self) {
        match self.turns.lock() {
            Ok(mut turns) => turns.clear(),
            Err(e) => warn!("conversation memory clear failed: {e}"),
        }
    }

    pub fn len(&self) -> usize {
        self.turns.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================
