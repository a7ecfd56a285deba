//! Serde data structures for the Hydra configuration file.
//!
//! Contains [`Config`] (the root), [`PluginConfig`], [`TestConfig`],
//! [`HeadConfig`] with its [`HeadKind`] variants, and the [`AdminConfig`],
//! [`IdentityConfig`] and [`Defaults`] sections. Structural types use
//! `deny_unknown_fields` for strict parsing; heads are internally tagged
//! by `type`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const fn default_timeout() -> u64 {
    5000
}

const fn default_true() -> bool {
    true
}

const fn default_status() -> u16 {
    200
}

fn default_admin_prefix() -> String {
    "/hydra-admin".into()
}

fn default_identity_cookie() -> String {
    "hydra-identity".into()
}

fn default_filter_path() -> String {
    "/.*".into()
}

fn default_mount_path() -> String {
    "/".into()
}

fn is_default_timeout(v: &u64) -> bool {
    *v == default_timeout()
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_default_status(v: &u16) -> bool {
    *v == default_status()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "AdminConfig::is_default")]
    pub admin: AdminConfig,

    #[serde(default, skip_serializing_if = "IdentityConfig::is_default")]
    pub identity: IdentityConfig,

    #[serde(default, skip_serializing_if = "Defaults::is_default")]
    pub defaults: Defaults,

    pub plugins: Vec<PluginConfig>,
}

impl Config {
    #[must_use]
    pub fn total_heads(&self) -> usize {
        self.plugins.iter().map(|p| p.heads.len()).sum()
    }

    #[must_use]
    pub fn total_tests(&self) -> usize {
        self.plugins.iter().map(|p| p.tests.len()).sum()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,

    #[serde(default = "default_admin_prefix")]
    pub prefix: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: default_admin_prefix(),
        }
    }
}

impl AdminConfig {
    fn is_default(&self) -> bool {
        self.enabled && self.prefix == default_admin_prefix()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_cookie")]
    pub cookie: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cookie: default_identity_cookie(),
        }
    }
}

impl IdentityConfig {
    fn is_default(&self) -> bool {
        self.cookie == default_identity_cookie()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    #[serde(
        default = "default_timeout",
        skip_serializing_if = "is_default_timeout"
    )]
    pub proxy_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            proxy_timeout: default_timeout(),
        }
    }
}

impl Defaults {
    fn is_default(&self) -> bool {
        self.proxy_timeout == default_timeout()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    pub name: String,

    /// Plugin directory (fixtures, test files). Relative paths resolve
    /// against the config file's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub heads: Vec<HeadConfig>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tests: BTreeMap<String, TestConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    #[serde(default)]
    pub heads: Vec<HeadConfig>,
}

// No deny_unknown_fields: serde does not support it together with flatten.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeadConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub attached: bool,

    #[serde(flatten)]
    pub kind: HeadKind,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HeadKind {
    Static {
        path: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        fixture: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,

        #[serde(default = "default_status", skip_serializing_if = "is_default_status")]
        status: u16,

        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
    Filter {
        #[serde(default = "default_filter_path")]
        path: String,

        replace: Vec<Replacement>,
    },
    Proxy {
        #[serde(default = "default_mount_path")]
        mount_path: String,

        proxy_to: String,

        #[serde(default, skip_serializing_if = "is_false")]
        set_host_header: bool,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    Expect {
        path: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        method: Option<String>,

        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        body_contains: Option<String>,
    },
}

impl HeadKind {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Static { .. } => "static",
            Self::Filter { .. } => "filter",
            Self::Proxy { .. } => "proxy",
            Self::Expect { .. } => "expect",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Replacement {
    pub pattern: String,
    pub with: String,
}
