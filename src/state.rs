use crate::error::StateError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Persistent checkpoint driving incremental indexing.
///
/// Maps an absolute file path to the SHA-256 digest of the content that was
/// last indexed successfully. Stored on disk as a flat JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct IndexState {
    files: BTreeMap<String, String>,
}

/// Hex-encoded SHA-256 of a file's content
pub fn content_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl IndexState {
    /// Load state from disk. A missing file yields an empty state, which means
    /// every file will be indexed on the next pass.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            tracing::debug!("Index state not found at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| StateError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let state: IndexState =
            serde_json::from_str(&content).map_err(|e| StateError::Malformed(e.to_string()))?;

        tracing::info!("Loaded index state with {} tracked files", state.len());
        Ok(state)
    }

    /// Save state to disk, replacing the previous document atomically
    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let fail = |reason: String| StateError::SaveFailed {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| fail(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| fail(e.to_string()))?;
        fs::rename(&tmp, path).map_err(|e| fail(e.to_string()))?;

        tracing::debug!("Saved index state ({} files) to {:?}", self.len(), path);
        Ok(())
    }

    pub fn digest(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// True when `path` was last indexed with exactly this digest
    pub fn is_current(&self, path: &str, digest: &str) -> bool {
        self.digest(path) == Some(digest)
    }

    pub fn record(&mut self, path: impl Into<String>, digest: impl Into<String>) {
        self.files.insert(path.into(), digest.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<String> {
        self.files.remove(path)
    }

    /// Tracked paths that live under `root`
    pub fn paths_under<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = &'a str> + 'a {
        self.files
            .keys()
            .filter(move |p| Path::new(p.as_str()).starts_with(root))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn default_path() -> PathBuf {
        crate::paths::PlatformPaths::default_state_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_content_digest_is_stable() {
        assert_eq!(content_digest("fn a() {}"), content_digest("fn a() {}"));
        assert_ne!(content_digest("fn a() {}"), content_digest("fn b() {}"));
        assert_eq!(content_digest("").len(), 64);
    }

    #[test]
    fn test_state_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("index_state.json");

        let mut state = IndexState::default();
        state.record("/repo/src/a.py", "d1");
        state.record("/repo/src/b.py", "d2");
        state.save(&path).unwrap();

        let loaded = IndexState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.is_current("/repo/src/a.py", "d1"));
        assert!(!loaded.is_current("/repo/src/a.py", "d2"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_state_is_flat_json_object() {
        let mut state = IndexState::default();
        state.record("/repo/a.go", "abc");
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"/repo/a.go":"abc"}"#);
    }

    #[test]
    fn test_load_missing_state_is_empty() {
        let state = IndexState::load(Path::new("/nonexistent/path/state.json")).unwrap();
        assert!(state.is_empty());
    }

    #[test]
    fn test_load_malformed_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            IndexState::load(&path),
            Err(StateError::Malformed(_))
        ));
    }

    #[test]
    fn test_remove_and_paths_under() {
        let mut state = IndexState::default();
        state.record("/repo/src/a.rs", "1");
        state.record("/repo/src/b.rs", "2");
        state.record("/other/c.rs", "3");

        let under: Vec<&str> = state.paths_under(Path::new("/repo")).collect();
        assert_eq!(under, vec!["/repo/src/a.rs", "/repo/src/b.rs"]);

        assert_eq!(state.remove("/repo/src/a.rs"), Some("1".to_string()));
        assert_eq!(state.remove("/repo/src/a.rs"), None);
        assert_eq!(state.len(), 2);
    }
}
