//! Use cases - orchestration of the adventure loop.

pub mod illustration;
pub mod narration;
pub mod scene;

pub use illustration::{IllustrationService, IllustrationStatus};
pub use narration::NarrationParser;
pub use scene::{PlayerInput, SceneEngine, SceneError};
