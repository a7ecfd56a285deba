//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for structural
//! errors such as missing plugins, malformed plugin names, duplicate
//! plugin or head names, path patterns that are not valid regular
//! expressions, static heads without content, bad HTTP methods, and
//! malformed proxy URLs. Returns a list of [`ValidationError`] values
//! with per-field suggestions.

use std::collections::HashSet;

use regex::Regex;
use url::Url;

use super::model::{Config, HeadConfig, HeadKind};
use crate::engine::registry::is_valid_plugin_name;
use crate::error::ValidationError;

pub const VALID_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS",
];

const ROOT: &str = "(root)";

/// Validate a head path pattern. Returns `Ok(())` or a human-readable error.
pub fn validate_pattern(pattern: &str) -> Result<(), String> {
    if pattern.is_empty() {
        return Err("path cannot be empty".into());
    }
    if !pattern.starts_with('/') {
        return Err("path must start with '/'".into());
    }
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| format!("'{pattern}' is not a valid pattern: {e}"))
}

/// Validate a proxy target URL. Returns `Ok(())` or a human-readable error.
pub fn validate_target_url(url: &str) -> Result<(), String> {
    match Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                Err(format!(
                    "unsupported scheme '{scheme}' (expected http or https)"
                ))
            } else {
                Ok(())
            }
        }
        Err(_) => Err(format!("'{url}' is not a valid URL")),
    }
}

/// Validate an HTTP method string. Returns `Ok(())` or a human-readable error.
pub fn validate_method(method: &str) -> Result<(), String> {
    let upper = method.to_uppercase();
    if VALID_METHODS.contains(&upper.as_str()) {
        Ok(())
    } else {
        Err(format!("'{method}' is not a valid HTTP method"))
    }
}

/// Closest valid plugin name, used as a suggestion.
fn suggest_plugin_name(name: &str) -> Option<String> {
    let candidate: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let candidate = candidate.trim_matches('-').to_string();
    (!candidate.is_empty()).then(|| format!("did you mean '{candidate}'?"))
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut push = |plugin: &str, field: &str, message: String, suggestion: Option<String>| {
        errors.push(ValidationError {
            plugin: plugin.to_string(),
            field: field.to_string(),
            message,
            suggestion,
        });
    };

    let prefix = &config.admin.prefix;
    if config.admin.enabled && (!prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/')) {
        let trimmed = prefix.trim_matches('/');
        push(
            ROOT,
            "admin.prefix",
            format!("'{prefix}' must start with '/', not end with '/', and not be the root"),
            (!trimmed.is_empty()).then(|| format!("did you mean '/{trimmed}'?")),
        );
    }

    if config.identity.cookie.trim().is_empty() {
        push(ROOT, "identity.cookie", "cookie name cannot be empty".into(), None);
    }

    if config.plugins.is_empty() {
        push(ROOT, "plugins", "at least one plugin must be defined".into(), None);
        return Err(errors);
    }

    let mut seen_plugins = HashSet::new();

    for (i, plugin) in config.plugins.iter().enumerate() {
        let plugin_id = if plugin.name.is_empty() {
            format!("plugins[{i}]")
        } else {
            plugin.name.clone()
        };

        if !is_valid_plugin_name(&plugin.name) {
            push(
                &plugin_id,
                "name",
                "plugin names may only contain letters, digits, '-' and '_'".into(),
                suggest_plugin_name(&plugin.name),
            );
        }

        if !seen_plugins.insert(plugin.name.to_ascii_lowercase()) {
            push(&plugin_id, "name", "duplicate plugin name".into(), None);
        }

        let mut check_heads = |field: &str, heads: &[HeadConfig]| {
            let mut seen_heads = HashSet::new();
            for head in heads {
                if let Some(name) = &head.name {
                    if name.is_empty() {
                        push(&plugin_id, field, "head name cannot be empty".into(), None);
                    } else if !seen_heads.insert(name.as_str()) {
                        push(&plugin_id, field, format!("duplicate head name '{name}'"), None);
                    }
                }
                for (message, suggestion) in check_head(&head.kind) {
                    push(&plugin_id, field, message, suggestion);
                }
            }
        };

        check_heads("heads", &plugin.heads);
        for (test, definition) in &plugin.tests {
            check_heads(&format!("tests.{test}.heads"), &definition.heads);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn pattern_problem(path: &str) -> Option<(String, Option<String>)> {
    validate_pattern(path).err().map(|msg| {
        let suggestion = (!path.is_empty() && !path.starts_with('/'))
            .then(|| format!("did you mean '/{path}'?"));
        (msg, suggestion)
    })
}

fn check_head(kind: &HeadKind) -> Vec<(String, Option<String>)> {
    let mut problems = Vec::new();

    match kind {
        HeadKind::Static {
            path,
            content,
            fixture,
            status,
            ..
        } => {
            problems.extend(pattern_problem(path));
            match (content, fixture) {
                (Some(_), Some(_)) => problems.push((
                    "static head takes either 'content' or 'fixture', not both".into(),
                    None,
                )),
                (None, None) => problems.push((
                    "static head needs 'content' or 'fixture'".into(),
                    None,
                )),
                _ => {}
            }
            if !(100..=599).contains(status) {
                problems.push((format!("status {status} is not a valid HTTP status"), None));
            }
        }
        HeadKind::Filter { path, replace } => {
            problems.extend(pattern_problem(path));
            if replace.is_empty() {
                problems.push(("filter head needs at least one 'replace' rule".into(), None));
            }
            for rule in replace {
                if let Err(e) = Regex::new(&rule.pattern) {
                    problems.push((format!("'{}' is not a valid pattern: {e}", rule.pattern), None));
                }
            }
        }
        HeadKind::Proxy {
            mount_path,
            proxy_to,
            ..
        } => {
            if !mount_path.starts_with('/') {
                problems.push((
                    "mount_path must start with '/'".into(),
                    Some(format!("did you mean '/{mount_path}'?")),
                ));
            }
            // Interpolated URLs are only known once plugin config is applied.
            if !proxy_to.contains("${") {
                if let Err(msg) = validate_target_url(proxy_to) {
                    problems.push((msg, None));
                }
            }
        }
        HeadKind::Expect { path, method, .. } => {
            problems.extend(pattern_problem(path));
            if let Some(method) = method {
                if let Err(msg) = validate_method(method) {
                    problems.push((msg, None));
                }
            }
        }
    }
    problems
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  {} plugins, {} heads, {} tests\n",
        config.plugins.len(),
        config.total_heads(),
        config.total_tests()
    )];

    for plugin in &config.plugins {
        let kinds: Vec<&str> = plugin.heads.iter().map(|h| h.kind.label()).collect();
        let tests: Vec<&str> = plugin.tests.keys().map(String::as_str).collect();

        lines.push(format!("  {}  -> {} heads", plugin.name, plugin.heads.len()));
        if !kinds.is_empty() {
            lines.push(format!("    kinds: {}", kinds.join(", ")));
        }
        if !tests.is_empty() {
            lines.push(format!("    tests: {}", tests.join(", ")));
        }
    }

    if config.admin.enabled {
        lines.push(format!("\n  admin: {}", config.admin.prefix));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::model::{AdminConfig, Defaults, IdentityConfig, PluginConfig, TestConfig};

    fn static_head(name: Option<&str>, path: &str) -> HeadConfig {
        HeadConfig {
            name: name.map(String::from),
            attached: true,
            kind: HeadKind::Static {
                path: path.into(),
                content: Some("hi".into()),
                fixture: None,
                content_type: None,
                status: 200,
                headers: BTreeMap::new(),
            },
        }
    }

    fn plugin(name: &str, heads: Vec<HeadConfig>) -> PluginConfig {
        PluginConfig {
            name: name.into(),
            path: None,
            config: BTreeMap::new(),
            heads,
            tests: BTreeMap::new(),
        }
    }

    fn config(plugins: Vec<PluginConfig>) -> Config {
        Config {
            admin: AdminConfig::default(),
            identity: IdentityConfig::default(),
            defaults: Defaults::default(),
            plugins,
        }
    }

    #[test]
    fn valid_config_passes() {
        let cfg = config(vec![plugin("hello", vec![static_head(Some("greeting"), "/hi")])]);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn empty_plugins_fails() {
        let errors = validate(&config(vec![])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("at least one plugin"));
    }

    #[test]
    fn bad_plugin_name_gets_suggestion() {
        let errors = validate(&config(vec![plugin("My Plugin", vec![])])).unwrap_err();
        assert_eq!(errors[0].field, "name");
        assert_eq!(errors[0].suggestion.as_deref(), Some("did you mean 'my-plugin'?"));
    }

    #[test]
    fn duplicate_plugin_names_fail_case_insensitively() {
        let errors =
            validate(&config(vec![plugin("auth", vec![]), plugin("AUTH", vec![])])).unwrap_err();
        assert!(errors.iter().any(|e| e.message == "duplicate plugin name"));
    }

    #[test]
    fn duplicate_head_names_are_scoped_per_list() {
        let mut p = plugin(
            "auth",
            vec![static_head(Some("h"), "/a"), static_head(Some("h"), "/b")],
        );
        p.tests.insert(
            "flow".into(),
            TestConfig {
                heads: vec![static_head(Some("h"), "/c")],
            },
        );
        let errors = validate(&config(vec![p])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "heads");
        assert!(errors[0].message.contains("duplicate head name 'h'"));
    }

    #[test]
    fn path_without_slash_fails() {
        let errors = validate(&config(vec![plugin("p", vec![static_head(None, "hi")])])).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.suggestion.as_deref() == Some("did you mean '/hi'?")));
    }

    #[test]
    fn invalid_regex_fails() {
        let errors =
            validate(&config(vec![plugin("p", vec![static_head(None, "/a(")])])).unwrap_err();
        assert!(errors[0].message.contains("not a valid pattern"));
    }

    #[test]
    fn static_needs_exactly_one_body_source() {
        let head = HeadConfig {
            name: None,
            attached: true,
            kind: HeadKind::Static {
                path: "/a".into(),
                content: None,
                fixture: None,
                content_type: None,
                status: 42,
                headers: BTreeMap::new(),
            },
        };
        let errors = validate(&config(vec![plugin("p", vec![head])])).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.message.contains("'content' or 'fixture'")));
        assert!(errors.iter().any(|e| e.message.contains("status 42")));
    }

    #[test]
    fn proxy_url_and_expect_method_are_checked() {
        let proxy = HeadConfig {
            name: None,
            attached: true,
            kind: HeadKind::Proxy {
                mount_path: "/".into(),
                proxy_to: "ftp://files".into(),
                set_host_header: false,
                timeout: None,
            },
        };
        let interpolated = HeadConfig {
            name: None,
            attached: true,
            kind: HeadKind::Proxy {
                mount_path: "/api".into(),
                proxy_to: "${backend}".into(),
                set_host_header: false,
                timeout: None,
            },
        };
        let expect = HeadConfig {
            name: None,
            attached: true,
            kind: HeadKind::Expect {
                path: "/login".into(),
                message: None,
                method: Some("FETCH".into()),
                headers: BTreeMap::new(),
                body_contains: None,
            },
        };
        let errors =
            validate(&config(vec![plugin("p", vec![proxy, interpolated, expect])])).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.message.contains("unsupported scheme 'ftp'")));
        assert!(errors.iter().any(|e| e.message.contains("not a valid HTTP method")));
    }

    #[test]
    fn admin_prefix_must_be_a_path() {
        let mut cfg = config(vec![plugin("p", vec![])]);
        cfg.admin.prefix = "admin/".into();
        let errors = validate(&cfg).unwrap_err();
        assert_eq!(errors[0].field, "admin.prefix");
        assert_eq!(errors[0].suggestion.as_deref(), Some("did you mean '/admin'?"));

        cfg.admin.enabled = false;
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn report_lists_plugins() {
        let cfg = config(vec![plugin("hello", vec![static_head(None, "/hi")])]);
        let report = format_validation_report("hydra.yaml", &cfg);
        assert!(report.starts_with("hydra.yaml is valid"));
        assert!(report.contains("1 plugins, 1 heads, 0 tests"));
        assert!(report.contains("kinds: static"));
        assert!(report.contains("admin: /hydra-admin"));
    }
}
