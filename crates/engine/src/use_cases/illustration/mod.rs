//! Asynchronous scene illustration.
//!
//! Image generation runs off the critical response path: `launch` spawns a
//! task per scene and returns immediately, and the outcome is published to
//! a bounded pending table that `poll` reads. A failed generation is
//! recorded as an absent reference, never surfaced as an error to the
//! narration path, and a launched scene id always resolves to either a
//! reference or an explicit miss.

pub mod prompt;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use delver_domain::SceneId;
use serde::Serialize;

use crate::infrastructure::image_store::ImageStore;
use crate::infrastructure::ports::{ImageGenPort, ImageRequest};

/// Result of polling for a scene's illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IllustrationStatus {
    pub ready: bool,
    pub reference: Option<String>,
}

impl IllustrationStatus {
    fn not_ready() -> Self {
        Self {
            ready: false,
            reference: None,
        }
    }
}

#[derive(Debug, Clone)]
enum JobState {
    Pending,
    Done(Option<String>),
}

#[derive(Debug)]
struct PendingEntry {
    state: JobState,
    inserted_at: Instant,
}

/// Owns the pending-results table and the cache-aware generation pipeline.
///
/// The table is bounded two ways: a finished entry is dropped once a poll
/// consumes it, and entries past `max_age` are swept on every launch, so
/// abandoned sessions cannot grow it without bound.
pub struct IllustrationService {
    image_gen: Arc<dyn ImageGenPort>,
    store: ImageStore,
    pending: DashMap<SceneId, PendingEntry>,
    max_age: Duration,
}

impl IllustrationService {
    pub fn new(image_gen: Arc<dyn ImageGenPort>, store: ImageStore) -> Self {
        Self {
            image_gen,
            store,
            pending: DashMap::new(),
            max_age: Duration::from_secs(15 * 60),
        }
    }

    /// Override the max age of unconsumed results.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Fire-and-forget: start generating an illustration for `scene_text`,
    /// publishing the outcome under `scene_id`. Never blocks the caller.
    pub fn launch(self: &Arc<Self>, scene_text: String, scene_id: SceneId) {
        self.sweep_expired();
        self.pending.insert(
            scene_id,
            PendingEntry {
                state: JobState::Pending,
                inserted_at: Instant::now(),
            },
        );

        let service = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = service.run_job(&scene_text, scene_id).await;
            service.pending.insert(
                scene_id,
                PendingEntry {
                    state: JobState::Done(outcome),
                    inserted_at: Instant::now(),
                },
            );
        });
    }

    /// Enhance, check the cache, generate on a miss, store. All failures
    /// are confined here and degrade to "no image for this scene".
    async fn run_job(&self, scene_text: &str, scene_id: SceneId) -> Option<String> {
        let enhanced = prompt::enhance(scene_text);
        let key = ImageStore::key_for(&enhanced);

        if let Some(reference) = self.store.lookup(&key).await {
            tracing::debug!(%scene_id, key, "illustration cache hit");
            return Some(reference);
        }

        match self.image_gen.check_health().await {
            Ok(true) => {}
            _ => {
                tracing::info!(%scene_id, "image backend unreachable, skipping illustration");
                return None;
            }
        }

        let result = match self.image_gen.generate(ImageRequest::new(enhanced)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(%scene_id, error = %e, "illustration generation failed");
                return None;
            }
        };

        match self.store.store(&key, &result.image_data, &result.format).await {
            Ok(reference) => {
                tracing::info!(%scene_id, key, "illustration stored");
                Some(reference)
            }
            Err(e) => {
                tracing::warn!(%scene_id, error = %e, "failed to store illustration");
                None
            }
        }
    }

    /// Check whether the illustration for `scene_id` is ready. A finished
    /// result is consumed by the poll that observes it; an unknown id is
    /// simply not ready.
    pub fn poll(&self, scene_id: SceneId) -> IllustrationStatus {
        let finished = match self.pending.get(&scene_id) {
            None => return IllustrationStatus::not_ready(),
            Some(entry) => match &entry.state {
                JobState::Pending => return IllustrationStatus::not_ready(),
                JobState::Done(reference) => reference.clone(),
            },
        };

        self.pending.remove(&scene_id);
        IllustrationStatus {
            ready: true,
            reference: finished,
        }
    }

    fn sweep_expired(&self) {
        self.pending
            .retain(|_, entry| entry.inserted_at.elapsed() < self.max_age);
    }

    #[cfg(test)]
    fn insert_done_at(&self, scene_id: SceneId, reference: Option<String>, inserted_at: Instant) {
        self.pending.insert(
            scene_id,
            PendingEntry {
                state: JobState::Done(reference),
                inserted_at,
            },
        );
    }

    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
