//! Fixture loading relative to a plugin's installation directory.
//!
//! Sanitization is deliberately weak: the literal `..` token is removed
//! and leading separators are dropped before joining under
//! `<plugin dir>/fixtures`. Encoded or platform-specific traversal
//! sequences are not canonicalized.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::HydraError;

#[derive(Debug, Clone)]
pub struct Fixtures {
    root: PathBuf,
}

impl Fixtures {
    #[must_use]
    pub fn new(plugin_dir: impl AsRef<Path>) -> Self {
        Self {
            root: plugin_dir.as_ref().join("fixtures"),
        }
    }

    #[must_use]
    pub fn resolve(&self, relative: &str) -> PathBuf {
        let sanitized = relative.replace("..", "");
        let trimmed = sanitized.trim_start_matches(['/', '\\']);
        self.root.join(trimmed)
    }

    /// Read a fixture. This blocks; call it while building plugins, not
    /// from a head's request path.
    pub fn load(&self, relative: &str) -> Result<Bytes, HydraError> {
        let path = self.resolve(relative);
        std::fs::read(&path)
            .map(Bytes::from)
            .map_err(|source| HydraError::Fixture { path, source })
    }
}
