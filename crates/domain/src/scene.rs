//! Derived scene records and scene identifiers.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier correlating an illustration job with a later poll.
///
/// Derived from the history length at the moment the assistant turn is
/// appended: monotonic within a session and unique per exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u64);

impl SceneId {
    pub fn from_history_len(len: usize) -> Self {
        Self(len as u64)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scene-{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid scene id: {0}")]
pub struct ParseSceneIdError(String);

impl FromStr for SceneId {
    type Err = ParseSceneIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("scene-")
            .and_then(|n| n.parse().ok())
            .map(SceneId)
            .ok_or_else(|| ParseSceneIdError(s.to_string()))
    }
}

impl Serialize for SceneId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SceneId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The player-facing unit of one exchange: cleaned narration, numbered
/// choices, the status line, and the id used to poll for an illustration.
///
/// Ephemeral and reconstructible from the conversation history; never
/// authoritative state itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneRecord {
    pub scene_text: String,
    pub options: BTreeMap<u32, String>,
    pub player_status: String,
    pub scene_id: SceneId,
}
