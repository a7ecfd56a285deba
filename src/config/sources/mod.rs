//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! Provides the file-based source (YAML, JSON, TOML formats gated by
//! feature flags) and the [`parse_str`] helper for format-specific
//! deserialization, shared with plugin test files.

pub mod file_source;

use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::error::HydraError;

/// File extensions accepted for config and plugin test files, in
/// auto-detection order.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    #[cfg(feature = "yaml")]
    "yaml",
    #[cfg(feature = "yaml")]
    "yml",
    #[cfg(feature = "json")]
    "json",
    #[cfg(feature = "toml")]
    "toml",
];

/// Parse a string based on file extension.
pub fn parse_str<T: DeserializeOwned>(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<T, HydraError> {
    let parse_error = |source: Box<dyn std::error::Error + Send + Sync>| HydraError::ConfigParse {
        path: path_display.to_string(),
        source,
    };

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| parse_error(Box::new(e))),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| parse_error(Box::new(e))),

        other => {
            // Only unused when every format feature is disabled.
            let _ = (content, &parse_error);
            Err(HydraError::UnsupportedFormat(other.to_string()))
        }
    }
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
