//! Append-only conversation history with a bounded context window.

use crate::turn::{Role, Turn};

/// Ordered conversation log owned by one game session.
///
/// Grows by `append` only; `reset` is the single operation that discards
/// turns, replacing the log wholesale with a fresh two-turn seed.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history seeded with the standing instruction and the
    /// opening player prompt.
    pub fn seeded(system: impl Into<String>, opening: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(system), Turn::user(opening)],
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Replace the entire history with a freshly seeded one.
    pub fn reset(&mut self, system: impl Into<String>, opening: impl Into<String>) {
        *self = Self::seeded(system, opening);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Content of the most recent assistant turn, if any.
    pub fn last_assistant(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant)
            .map(|t| t.content.as_str())
    }

    /// Bounded slice to send upstream: the leading system turn (if the
    /// first turn has that role) followed by the last `max_recent` turns,
    /// in original order, with no duplication when the system turn falls
    /// inside the recent window. Pure function of the current log.
    pub fn window(&self, max_recent: usize) -> Vec<Turn> {
        let recent_start = self.turns.len().saturating_sub(max_recent);
        let mut out = Vec::with_capacity(max_recent + 1);

        if recent_start > 0 {
            if let Some(first) = self.turns.first() {
                if first.role == Role::System {
                    out.push(first.clone());
                }
            }
        }
        out.extend(self.turns[recent_start..].iter().cloned());
        out
    }
}
