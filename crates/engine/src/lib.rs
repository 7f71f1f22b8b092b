//! Delver Engine library.
//!
//! Server-side code for the Delver adventure loop.
//!
//! ## Structure
//!
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `use_cases/` - Orchestration: narration parsing, illustration, scene engine
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

pub use app::App;
