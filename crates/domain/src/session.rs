//! Single-player game session state.

use crate::history::ConversationHistory;
use crate::player::Player;
use crate::scene::SceneId;

/// Everything one playthrough owns: the conversation log and the player.
///
/// The scene engine mutates this; each session is independent and
/// single-player, so no synchronization lives here.
#[derive(Debug, Clone, Default)]
pub struct GameSession {
    pub history: ConversationHistory,
    pub player: Player,
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene id for the exchange that produced the current history.
    pub fn current_scene_id(&self) -> SceneId {
        SceneId::from_history_len(self.history.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::Turn;

    #[test]
    fn scene_id_tracks_history_growth() {
        let mut session = GameSession::new();
        let before = session.current_scene_id();
        session.history.append(Turn::user("go north"));
        session.history.append(Turn::assistant("You head north."));
        assert!(before < session.current_scene_id());
    }
}
