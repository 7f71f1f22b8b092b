//! Application state and composition.

use std::sync::Arc;

use delver_domain::GameSession;
use tokio::sync::Mutex;

use crate::infrastructure::image_store::ImageStore;
use crate::infrastructure::ports::{ImageGenPort, LlmPort};
use crate::use_cases::illustration::IllustrationService;
use crate::use_cases::scene::SceneEngine;

/// Main application state.
///
/// Holds the scene engine, the illustration service, and the single game
/// session. Passed to HTTP handlers via Axum state.
pub struct App {
    pub engine: SceneEngine,
    pub illustrations: Arc<IllustrationService>,
    pub session: Mutex<GameSession>,
}

impl App {
    /// Wire up the engine from its injected ports.
    pub fn new(
        llm: Arc<dyn LlmPort>,
        image_gen: Arc<dyn ImageGenPort>,
        store: ImageStore,
        max_recent: usize,
    ) -> Self {
        let illustrations = Arc::new(IllustrationService::new(image_gen, store));
        let engine = SceneEngine::new(llm, illustrations.clone(), max_recent);

        Self {
            engine,
            illustrations,
            session: Mutex::new(GameSession::new()),
        }
    }
}
