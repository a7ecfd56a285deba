//! Unified error types for Hydra.
//!
//! Defines [`HydraError`] (the main crate error enum) and
//! [`ValidationError`] for config validation failures. Both use
//! `thiserror` for `Display` and `Error` derives. Registry and scenario
//! errors name the plugin, head or test involved so the administrative
//! surface can report them verbatim.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub plugin: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "  plugin {}: {}: {}",
            self.plugin, self.field, self.message
        )?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HydraError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid plugin: {0}")]
    InvalidPlugin(String),

    #[error("Duplicate head name '{head}' in plugin '{plugin}'")]
    DuplicateHeadName { plugin: String, head: String },

    #[error("Plugin '{0}' not found")]
    PluginNotFound(String),

    #[error("Head '{head}' not found in plugin '{plugin}'")]
    HeadNotFound { plugin: String, head: String },

    #[error("Test '{test}' not found in plugin '{plugin}'")]
    InvalidTestReference { plugin: String, test: String },

    #[error("Continuation for head '{head}' (plugin '{plugin}') was invoked more than once")]
    InvalidContinuationArguments { plugin: String, head: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Cannot load fixture {}: {source}", path.display())]
    Fixture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No config source found.\n\n  {hint}")]
    NoConfigSource { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),
}

impl HydraError {
    /// Whether the error reports a missing plugin, head or test.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PluginNotFound(_) | Self::HeadNotFound { .. } | Self::InvalidTestReference { .. }
        )
    }
}
