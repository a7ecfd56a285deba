//! Hydra is a programmable HTTP mock server and proxy.
//!
//! Every request is routed through an ordered chain of *heads*
//! contributed by *plugins*. A head either answers the request or hands
//! it on to the rest of the chain through a continuation, so heads can
//! serve canned content, forward to a real backend, or rewrite whatever
//! later heads produce. Plugins also carry *tests*: scenarios whose heads
//! take priority while active and whose assertions are recorded per
//! test. Each caller identity gets its own isolated engine.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate, health).
//! - [`config`] -- Configuration loading and validation via the
//!   [`ConfigSource`](config::ConfigSource) trait.
//! - [`engine`] -- Plugin registry, dispatch, scenarios, assertions, and
//!   per-identity instances.
//! - [`heads`] -- The [`Head`](heads::Head) trait and the static, filter,
//!   proxy, and expect heads.
//! - [`plugins`] -- Plugin factories, including config-file plugins and
//!   fixture loading.
//! - [`exchange`] -- Request and response values passed along a chain.
//! - [`admin`] -- Administrative routes for heads and tests.
//! - [`gateway`] -- Fallback handler dispatching requests into engines.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`identity`] -- Caller identity from the request cookie.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`server`] -- Axum server setup, shared application state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod admin;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod gateway;
pub mod heads;
pub mod health;
pub mod identity;
pub mod logging;
pub mod plugins;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;
