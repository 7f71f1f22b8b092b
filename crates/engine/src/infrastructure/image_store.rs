//! Filesystem-backed illustration cache.
//!
//! The store IS the cache: a key maps to a file under the image root, and
//! `lookup` asks the filesystem directly, so cached scenes survive process
//! restarts with no in-memory duplicate of truth. Entries are write-once
//! per key and never expire.

use std::path::{Path, PathBuf};

/// Maximum length of a derived cache key.
const MAX_KEY_LEN: usize = 50;

/// Web path under which stored images are served.
pub const PUBLIC_IMAGE_BASE: &str = "/static/images";

/// Formats the generation backend produces, in lookup order.
const KNOWN_FORMATS: [&str; 2] = ["png", "jpeg"];

/// Prompt-keyed image storage on the local filesystem.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory that holds the stored images (for static file serving).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the cache key for an enhanced prompt: keep only ASCII
    /// alphanumerics, spaces, `-` and `_` (other whitespace is dropped,
    /// fusing the words around it); collapse space runs to single
    /// underscores; truncate to 50 characters.
    ///
    /// Two distinct prompts can normalize to the same key and will then
    /// share an image. Known limitation, not detected.
    pub fn key_for(prompt: &str) -> String {
        let filtered: String = prompt
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .collect();

        filtered
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .take(MAX_KEY_LEN)
            .collect()
    }

    fn file_path(&self, key: &str, format: &str) -> PathBuf {
        self.root.join(format!("{key}.{format}"))
    }

    /// Web reference a stored key resolves to.
    pub fn reference_for(&self, key: &str, format: &str) -> String {
        format!("{PUBLIC_IMAGE_BASE}/{key}.{format}")
    }

    /// Return the reference for `key` if an image already exists for it,
    /// in any of the formats the backend produces.
    pub async fn lookup(&self, key: &str) -> Option<String> {
        for format in KNOWN_FORMATS {
            let exists = tokio::fs::try_exists(self.file_path(key, format))
                .await
                .unwrap_or(false);
            if exists {
                return Some(self.reference_for(key, format));
            }
        }
        None
    }

    /// Write image bytes under `key` and return the reference subsequent
    /// lookups will see. `format` becomes the file extension.
    pub async fn store(&self, key: &str, bytes: &[u8], format: &str) -> std::io::Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.file_path(key, format), bytes).await?;
        Ok(self.reference_for(key, format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_strips_disallowed_characters() {
        assert_eq!(
            ImageStore::key_for("You see a door! (It's locked.)"),
            "You_see_a_door_Its_locked"
        );
    }

    #[test]
    fn key_collapses_space_runs() {
        assert_eq!(ImageStore::key_for("dark   stone hall"), "dark_stone_hall");
    }

    #[test]
    fn key_drops_non_space_whitespace() {
        // Newlines and tabs are stripped outright, fusing adjacent words.
        assert_eq!(ImageStore::key_for("dark   stone\n\thall"), "dark_stonehall");
    }

    #[test]
    fn key_is_truncated() {
        let long = "torch ".repeat(40);
        let key = ImageStore::key_for(&long);
        assert_eq!(key.chars().count(), 50);
    }

    #[test]
    fn key_is_deterministic() {
        let prompt = "a ruined tower, cinematic lighting";
        assert_eq!(ImageStore::key_for(prompt), ImageStore::key_for(prompt));
    }

    #[test]
    fn key_keeps_hyphen_and_underscore() {
        assert_eq!(ImageStore::key_for("half-orc_shaman"), "half-orc_shaman");
    }

    #[tokio::test]
    async fn lookup_misses_then_hits_after_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::new(dir.path());
        let key = ImageStore::key_for("a mossy crypt");

        assert_eq!(store.lookup(&key).await, None);

        let reference = store
            .store(&key, b"not-really-a-png", "png")
            .await
            .expect("store");
        assert_eq!(reference, format!("/static/images/{key}.png"));
        assert_eq!(store.lookup(&key).await, Some(reference));
    }

    #[tokio::test]
    async fn lookup_finds_jpeg_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::new(dir.path());
        let key = ImageStore::key_for("a sunlit clearing");

        let reference = store.store(&key, b"jpeg-bytes", "jpeg").await.expect("store");
        assert_eq!(reference, format!("/static/images/{key}.jpeg"));
        assert_eq!(store.lookup(&key).await, Some(reference));
    }

    #[tokio::test]
    async fn store_creates_missing_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::new(dir.path().join("nested/images"));
        store.store("key", b"bytes", "png").await.expect("store");
        assert!(store.lookup("key").await.is_some());
    }
}
