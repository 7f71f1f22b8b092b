//! Delver Domain - core session state for the adventure loop.
//!
//! Pure data types only: conversation turns, the bounded history window,
//! player status, and the derived scene record. No I/O, no async.

pub mod history;
pub mod player;
pub mod scene;
pub mod session;
pub mod turn;

pub use history::ConversationHistory;
pub use player::Player;
pub use scene::{SceneId, SceneRecord};
pub use session::GameSession;
pub use turn::{Role, Turn};
