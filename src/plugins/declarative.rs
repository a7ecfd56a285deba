//! Plugins described in the config file.
//!
//! A [`DeclarativePlugin`] turns each [`HeadConfig`] into a concrete head
//! for every instance it is built for. String fields go through
//! [`PluginContext::interpolate`] first, so `${key}` placeholders pick up
//! plugin config and command-line variables. Tests come from the inline
//! `tests` map plus one file per test under `<plugin dir>/tests/`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

use super::{PluginContext, PluginDefinition, PluginFactory, TestDefinition};
use crate::config::model::{HeadConfig, HeadKind, PluginConfig, TestConfig};
use crate::config::sources::{parse_str, SUPPORTED_EXTENSIONS};
use crate::error::HydraError;
use crate::heads::expect::ExpectHead;
use crate::heads::filter::{FilterHead, ReplaceFilter};
use crate::heads::proxy::ProxyHead;
use crate::heads::static_head::StaticHead;
use crate::heads::{HeadSpec, PathPattern};

pub struct DeclarativePlugin {
    config: PluginConfig,
    dir: PathBuf,
}

impl DeclarativePlugin {
    /// Plugin rooted at `config.path` (relative to `base_dir`), or at
    /// `<base_dir>/plugins/<name>` when no path is given.
    #[must_use]
    pub fn new(config: PluginConfig, base_dir: &Path) -> Self {
        let dir = config.path.as_ref().map_or_else(
            || base_dir.join("plugins").join(&config.name),
            |p| base_dir.join(p),
        );
        Self { config, dir }
    }

    /// Tests stored as individual files, keyed by file stem.
    fn file_tests(&self) -> Result<BTreeMap<String, TestConfig>, HydraError> {
        let tests_dir = self.dir.join("tests");
        let entries = match std::fs::read_dir(&tests_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(HydraError::Io(e)),
        };

        let mut tests = BTreeMap::new();
        for entry in entries {
            let path = entry?.path();
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !SUPPORTED_EXTENSIONS.contains(&ext) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)?;
            let test: TestConfig = parse_str(ext, &content, &path.display().to_string())?;
            if tests.insert(stem.to_string(), test).is_some() {
                return Err(HydraError::InvalidPlugin(format!(
                    "plugin '{}' has more than one file for test '{stem}'",
                    self.config.name
                )));
            }
        }
        Ok(tests)
    }
}

impl PluginFactory for DeclarativePlugin {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn directory(&self) -> Option<&Path> {
        Some(&self.dir)
    }

    fn config(&self) -> BTreeMap<String, String> {
        self.config.config.clone()
    }

    fn build(&self, ctx: &PluginContext) -> Result<PluginDefinition, HydraError> {
        let heads = build_heads(&self.config.name, &self.config.heads, ctx)?;

        let mut tests = BTreeMap::new();
        for (name, test) in &self.config.tests {
            let heads = build_heads(&self.config.name, &test.heads, ctx)?;
            tests.insert(name.clone(), TestDefinition { heads });
        }
        for (name, test) in self.file_tests()? {
            if tests.contains_key(&name) {
                return Err(HydraError::InvalidPlugin(format!(
                    "test '{name}' of plugin '{}' is defined both inline and in tests/",
                    self.config.name
                )));
            }
            let heads = build_heads(&self.config.name, &test.heads, ctx)?;
            tests.insert(name, TestDefinition { heads });
        }

        Ok(PluginDefinition {
            name: self.config.name.clone(),
            heads,
            tests,
        })
    }
}

fn build_heads(
    plugin: &str,
    heads: &[HeadConfig],
    ctx: &PluginContext,
) -> Result<Vec<HeadSpec>, HydraError> {
    heads.iter().map(|head| build_head(plugin, head, ctx)).collect()
}

fn build_head(plugin: &str, config: &HeadConfig, ctx: &PluginContext) -> Result<HeadSpec, HydraError> {
    let invalid = |msg: String| HydraError::InvalidPlugin(format!("plugin '{plugin}': {msg}"));
    let pattern = |path: &str| {
        let path = ctx.interpolate(path);
        PathPattern::new(&path).map_err(|e| invalid(format!("bad path pattern '{path}': {e}")))
    };

    let mut spec = match &config.kind {
        HeadKind::Static {
            path,
            content,
            fixture,
            content_type,
            status,
            headers,
        } => {
            let body = match (content, fixture) {
                (Some(content), _) => ctx.interpolate(content).into(),
                (None, Some(fixture)) => ctx.fixtures.load(&ctx.interpolate(fixture))?,
                (None, None) => return Err(invalid("static head needs content or fixture".into())),
            };
            let status = StatusCode::from_u16(*status)
                .map_err(|_| invalid(format!("invalid status {status}")))?;
            let mut header_map = header_map(headers, ctx).map_err(invalid)?;
            if let Some(content_type) = content_type {
                let value = HeaderValue::from_str(&ctx.interpolate(content_type))
                    .map_err(|_| invalid(format!("invalid content type '{content_type}'")))?;
                header_map.insert(axum::http::header::CONTENT_TYPE, value);
            }
            HeadSpec::new(
                StaticHead::new(pattern(path)?, body)
                    .with_status(status)
                    .with_headers(header_map),
            )
        }
        HeadKind::Filter { path, replace } => {
            let mut filter = ReplaceFilter::new();
            for rule in replace {
                let regex = regex::Regex::new(&rule.pattern)
                    .map_err(|e| invalid(format!("bad replace pattern '{}': {e}", rule.pattern)))?;
                filter = filter.rule(regex, ctx.interpolate(&rule.with));
            }
            HeadSpec::new(FilterHead::new(pattern(path)?, filter))
        }
        HeadKind::Proxy {
            mount_path,
            proxy_to,
            set_host_header,
            timeout,
        } => {
            let target = ctx.interpolate(proxy_to);
            let url = url::Url::parse(&target)
                .map_err(|e| invalid(format!("bad proxy target '{target}': {e}")))?;
            let timeout = timeout.map_or(ctx.env.proxy_timeout, Duration::from_millis);
            HeadSpec::new(
                ProxyHead::new(&ctx.interpolate(mount_path), url, ctx.env.http_client.clone())
                    .with_host_header(*set_host_header)
                    .with_timeout(timeout),
            )
        }
        HeadKind::Expect {
            path,
            message,
            method,
            headers,
            body_contains,
        } => {
            let mut head = ExpectHead::new(pattern(path)?, ctx.assert.clone());
            if let Some(message) = message {
                head = head.with_message(ctx.interpolate(message));
            }
            if let Some(method) = method {
                let method = Method::from_bytes(method.to_uppercase().as_bytes())
                    .map_err(|_| invalid(format!("invalid method '{method}'")))?;
                head = head.expect_method(method);
            }
            for (name, value) in headers {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| invalid(format!("invalid header name '{name}'")))?;
                head = head.expect_header(name, ctx.interpolate(value));
            }
            if let Some(needle) = body_contains {
                head = head.expect_body_containing(ctx.interpolate(needle));
            }
            HeadSpec::new(head)
        }
    };

    spec.name.clone_from(&config.name);
    Ok(if config.attached { spec } else { spec.detached() })
}

fn header_map(headers: &BTreeMap<String, String>, ctx: &PluginContext) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let key = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| format!("invalid header name '{name}'"))?;
        let value = HeaderValue::from_str(&ctx.interpolate(value))
            .map_err(|_| format!("invalid value for header '{name}'"))?;
        map.insert(key, value);
    }
    Ok(map)
}
