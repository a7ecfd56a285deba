//! `hydra validate`: check a config file and its plugin directories.
//!
//! Validation runs in two stages. The parsed config is checked for
//! structural problems first; when it passes, every plugin is built once
//! for a throwaway identity, which reads fixtures and plugin test files
//! exactly as `hydra run` would at startup.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::model::Config;
use crate::config::sources::file_source::FileSource;
use crate::config::validation;
use crate::config::ConfigSource;
use crate::engine::instances::{InstanceManager, DEFAULT_IDENTITY};
use crate::error::{HydraError, ValidationError};
use crate::plugins::declarative::DeclarativePlugin;
use crate::plugins::{PluginEnv, PluginFactory};
use crate::server::build_http_client;

pub async fn execute(args: &ValidateArgs) -> Result<(), HydraError> {
    let source = FileSource::new(args.config.clone())?;
    let config = source.parse().await?;
    let path = source.path().display().to_string();

    let outcome = match validation::validate(&config) {
        Ok(()) => load_plugins(&config, &source.base_dir()).await,
        Err(errors) => Err(HydraError::ConfigValidation { errors }),
    };

    match args.format {
        ValidateFormat::Text => match &outcome {
            Ok(()) => println!(
                "\u{2713} {}",
                validation::format_validation_report(&path, &config)
            ),
            Err(HydraError::ConfigValidation { errors }) => {
                eprintln!("\u{2717} {path} has {} errors\n", errors.len());
                for error in errors {
                    eprintln!("{error}");
                }
            }
            Err(e) => eprintln!("\u{2717} {path}: plugins failed to load: {e}"),
        },
        ValidateFormat::Json => println!("{}", json_report(&config, outcome.as_ref().err())),
    }

    outcome
}

/// Build every plugin once, as the default identity would at startup.
async fn load_plugins(config: &Config, base_dir: &Path) -> Result<(), HydraError> {
    let factories: Vec<Arc<dyn PluginFactory>> = config
        .plugins
        .iter()
        .map(|p| Arc::new(DeclarativePlugin::new(p.clone(), base_dir)) as Arc<dyn PluginFactory>)
        .collect();
    let mut env = PluginEnv::new(build_http_client());
    env.proxy_timeout = Duration::from_millis(config.defaults.proxy_timeout);

    InstanceManager::new(factories, env)
        .instance(DEFAULT_IDENTITY)
        .await
        .map(|_| ())
}

fn error_json(e: &ValidationError) -> Value {
    json!({
        "plugin": e.plugin,
        "field": e.field,
        "message": e.message,
        "suggestion": e.suggestion,
    })
}

fn json_report(config: &Config, error: Option<&HydraError>) -> Value {
    match error {
        None => {
            let plugins: Vec<Value> = config
                .plugins
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "heads": p.heads.len(),
                        "tests": p.tests.keys().collect::<Vec<_>>(),
                    })
                })
                .collect();
            json!({ "valid": true, "plugins": plugins })
        }
        Some(HydraError::ConfigValidation { errors }) => json!({
            "valid": false,
            "errors": errors.iter().map(error_json).collect::<Vec<_>>(),
        }),
        Some(other) => json!({
            "valid": false,
            "errors": [{ "message": other.to_string() }],
        }),
    }
}
