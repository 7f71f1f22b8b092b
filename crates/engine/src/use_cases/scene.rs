//! Scene engine: the advance/reset state machine of the adventure loop.
//!
//! Each turn: resolve the player's intent against the current options,
//! append the user turn, call the chat backend over the bounded history
//! window, parse the reply into narration + choices, and fire an
//! illustration job for the new scene. The chat call is synchronous per
//! turn; only illustration runs in the background.

use std::sync::Arc;

use delver_domain::{GameSession, Player, SceneRecord, Turn};

use crate::infrastructure::ports::{ChatMessage, LlmError, LlmPort, LlmRequest};
use crate::use_cases::illustration::IllustrationService;
use crate::use_cases::narration::NarrationParser;

/// Standing instruction seeded as the first turn of every session.
pub const SYSTEM_PROMPT: &str = "You are a dungeon master guiding the player through a dark dungeon. \
     Always give 2 or 3 clear numbered options for the player to choose from. \
     Keep your responses short, punchy, and conversational. \
     Describe scenes briefly with vivid but minimal detail.";

/// Opening player prompt seeded as the second turn.
pub const OPENING_PROMPT: &str = "You're standing at the entrance of a dark dungeon. \
     Say something short and natural, then give 3 simple numbered options for the player.";

/// Default number of recent turns sent upstream alongside the system turn.
pub const DEFAULT_MAX_RECENT_TURNS: usize = 6;

/// The player's intent for one turn.
#[derive(Debug, Clone)]
pub enum PlayerInput {
    /// A numbered choice resolved against the current scene's options.
    Choice(u32),
    /// Free text, used verbatim.
    FreeText(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The choice number doesn't resolve against the current options.
    /// Recovered at the API layer; history is untouched.
    #[error("choice {0} is not one of the current options")]
    InvalidChoice(u32),
    /// The chat backend failed; hard failure for this turn.
    #[error(transparent)]
    Backend(#[from] LlmError),
}

/// Orchestrates one game session's turns.
pub struct SceneEngine {
    llm: Arc<dyn LlmPort>,
    illustrations: Arc<IllustrationService>,
    parser: NarrationParser,
    max_recent: usize,
}

impl SceneEngine {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        illustrations: Arc<IllustrationService>,
        max_recent: usize,
    ) -> Self {
        Self {
            llm,
            illustrations,
            parser: NarrationParser::new(),
            max_recent,
        }
    }

    /// Advance the session by one turn.
    ///
    /// An unresolved choice number returns `InvalidChoice` without touching
    /// history or calling any backend. If the chat call fails, the appended
    /// user turn stays in history; the caller may retry the turn.
    pub async fn advance(
        &self,
        session: &mut GameSession,
        input: PlayerInput,
    ) -> Result<SceneRecord, SceneError> {
        let text = match input {
            PlayerInput::FreeText(text) => text,
            PlayerInput::Choice(number) => {
                let options = session
                    .history
                    .last_assistant()
                    .map(|reply| self.parser.parse(reply))
                    .unwrap_or_default();
                options
                    .get(&number)
                    .cloned()
                    .ok_or(SceneError::InvalidChoice(number))?
            }
        };

        session.history.append(Turn::user(text));
        self.generate_scene(session).await
    }

    /// Replace the session with a freshly seeded one and narrate the
    /// opening scene.
    pub async fn reset(&self, session: &mut GameSession) -> Result<SceneRecord, SceneError> {
        session.history.reset(SYSTEM_PROMPT, OPENING_PROMPT);
        session.player = Player::new();
        self.generate_scene(session).await
    }

    /// Rebuild the scene record for the latest assistant turn without any
    /// backend calls. `None` if no scene has been narrated yet.
    pub fn current_scene(&self, session: &GameSession) -> Option<SceneRecord> {
        let reply = session.history.last_assistant()?;
        Some(SceneRecord {
            scene_text: self.parser.clean_narration(reply),
            options: self.parser.parse(reply),
            player_status: session.player.status_line(),
            scene_id: session.current_scene_id(),
        })
    }

    /// Shared tail of `advance` and `reset`: call the chat backend over the
    /// bounded window, append the reply, derive the scene, and fire the
    /// illustration job.
    async fn generate_scene(&self, session: &mut GameSession) -> Result<SceneRecord, SceneError> {
        let window = session.history.window(self.max_recent);
        let request = LlmRequest::new(window.into_iter().map(ChatMessage::from).collect());

        let reply = self.llm.generate(request).await?;
        session.history.append(Turn::assistant(reply.content.clone()));

        let scene_text = self.parser.clean_narration(&reply.content);
        let options = self.parser.parse(&reply.content);
        let scene_id = session.current_scene_id();

        self.illustrations.launch(scene_text.clone(), scene_id);

        tracing::info!(
            %scene_id,
            history_len = session.history.len(),
            option_count = options.len(),
            "scene advanced"
        );

        Ok(SceneRecord {
            scene_text,
            options,
            player_status: session.player.status_line(),
            scene_id,
        })
    }
}
