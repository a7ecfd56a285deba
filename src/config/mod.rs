//! Configuration loading and validation.
//!
//! Defines the [`ConfigSource`] trait for pluggable config backends and
//! the [`ConfigVersion`] enum identifying what was loaded. Submodules
//! provide the data model, validation logic, and concrete file sources.
//! Config is loaded once at startup: engine instances live for the whole
//! process, so plugins are never hot-swapped under them.

pub mod model;
pub mod sources;
pub mod validation;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::HydraError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl ConfigVersion {
    /// First eight characters of the version hash.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}

// async_trait is required here because ConfigSource is used as Box<dyn ConfigSource>
// and native async fn in traits (Rust 1.75+) does not support dyn dispatch.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Directory that relative plugin paths resolve against.
    fn base_dir(&self) -> PathBuf;

    async fn load(&self) -> Result<(Config, ConfigVersion), HydraError>;
}

/// Directory of a config file, or `.` for a bare file name.
#[must_use]
pub fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_version_is_eight_chars() {
        let v = ConfigVersion::Hash("0123456789abcdef".into());
        assert_eq!(v.short(), "01234567");
        assert_eq!(ConfigVersion::Hash("abc".into()).short(), "abc");
    }

    #[test]
    fn parent_dir_of_bare_file_is_cwd() {
        assert_eq!(parent_dir(Path::new("hydra.yaml")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("conf/hydra.yaml")), PathBuf::from("conf"));
    }
}
