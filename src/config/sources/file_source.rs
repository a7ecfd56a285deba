//! Async file-based config source with SHA256 versioning.
//!
//! [`FileSource`] implements [`ConfigSource`] for any supported format,
//! chosen from the file extension. It reads the file asynchronously via
//! Tokio, validates the result, and computes a SHA256 hash of the raw
//! text as the config version.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{parse_str, sha256_hex};
use crate::config::model::Config;
use crate::config::validation::validate;
use crate::config::{parent_dir, ConfigSource, ConfigVersion};
use crate::error::HydraError;

pub struct FileSource {
    path: PathBuf,
    ext: String,
}

impl FileSource {
    /// Source for `path`, failing early when its format is unsupported.
    pub fn new(path: PathBuf) -> Result<Self, HydraError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !super::SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(HydraError::UnsupportedFormat(ext));
        }
        Ok(Self { path, ext })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file without validating it.
    pub async fn parse(&self) -> Result<Config, HydraError> {
        let content = self.read_content().await?;
        parse_str(&self.ext, &content, &self.path.display().to_string())
    }

    async fn read_content(&self) -> Result<String, HydraError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HydraError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                HydraError::Io(e)
            }
        })
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    fn name(&self) -> &'static str {
        match self.ext.as_str() {
            "yaml" | "yml" => "yaml",
            "json" => "json",
            _ => "toml",
        }
    }

    fn base_dir(&self) -> PathBuf {
        parent_dir(&self.path)
    }

    async fn load(&self) -> Result<(Config, ConfigVersion), HydraError> {
        let content = self.read_content().await?;
        let config: Config = parse_str(&self.ext, &content, &self.path.display().to_string())?;

        if let Err(errors) = validate(&config) {
            return Err(HydraError::ConfigValidation { errors });
        }

        let hash = sha256_hex(content.as_bytes());
        Ok((config, ConfigVersion::Hash(hash)))
    }
}

#[cfg(all(test, feature = "yaml"))]
mod tests {
    use super::*;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hydra-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(matches!(
            FileSource::new(PathBuf::from("hydra.ini")),
            Err(HydraError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn loads_validates_and_hashes() {
        let path = write_temp(
            "hydra.yaml",
            "plugins:\n  - name: hello\n    heads:\n      - type: static\n        path: /hi\n        content: hi\n",
        );
        let source = FileSource::new(path.clone()).unwrap();
        let (config, version) = source.load().await.unwrap();
        assert_eq!(config.plugins[0].name, "hello");
        assert_eq!(version, ConfigVersion::Hash(sha256_hex(&std::fs::read(&path).unwrap())));
        assert_eq!(source.base_dir(), path.parent().unwrap());
        assert_eq!(source.name(), "yaml");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = FileSource::new(PathBuf::from("/nonexistent/hydra.yaml")).unwrap();
        assert!(matches!(
            source.load().await,
            Err(HydraError::ConfigFileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_config_fails_validation() {
        let path = write_temp("hydra.yaml", "plugins:\n  - name: Bad Name!\n    heads: []\n");
        let source = FileSource::new(path).unwrap();
        assert!(matches!(
            source.load().await,
            Err(HydraError::ConfigValidation { .. })
        ));
    }
}
