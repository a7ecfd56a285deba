//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, validate, health), and their associated argument
//! structs. Every flag has an environment variable equivalent for
//! container deployments.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "hydra",
    version,
    about = "Programmable HTTP mock server and proxy built from chains of heads",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        hydra run                            Start with ./hydra.yaml\n  \
        hydra run -c mocks.yaml              Start with a specific config\n  \
        hydra run -c mocks.yaml backend=http://localhost:8080\n  \
        hydra validate mocks.yaml            Check a config without starting"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the mock server
    Run(Box<RunArgs>),

    /// Validate a config file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        hydra run                                   Auto-detect config\n  \
        hydra run -c mocks.yaml -p 8080 --pretty    Local dev mode\n  \
        hydra run -c mocks.yaml env=staging         Extra plugin variable")]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "HYDRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Default proxy head timeout in milliseconds
    #[arg(long, env = "HYDRA_PROXY_TIMEOUT_MS", help_heading = "Tuning")]
    pub timeout: Option<u64>,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,

    /// Whole-request timeout in milliseconds
    #[arg(
        long,
        env = "REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        help_heading = "Tuning"
    )]
    pub request_timeout: u64,

    /// Extra plugin variables (`key=value`), overriding plugin config
    #[arg(value_parser = parse_var, value_name = "KEY=VALUE")]
    pub vars: Vec<(String, String)>,
}

impl RunArgs {
    #[must_use]
    pub fn extra_vars(&self) -> BTreeMap<String, String> {
        self.vars.iter().cloned().collect()
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("'{raw}' is not a key=value pair")),
    }
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "hydra.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// URL of the running instance
    #[arg(default_value = "http://localhost:3000")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => *args,
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn trailing_pairs_become_extra_vars() {
        let args = run_args(&["hydra", "run", "-c", "m.yaml", "backend=http://x:1/a=b", "env="]);
        let vars = args.extra_vars();
        assert_eq!(vars["backend"], "http://x:1/a=b");
        assert_eq!(vars["env"], "");
        assert_eq!(args.port, 3000);
        assert_eq!(args.request_timeout, 30_000);
        assert!(args.timeout.is_none());
    }

    #[test]
    fn malformed_var_is_rejected() {
        assert!(Cli::try_parse_from(["hydra", "run", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["hydra", "run", "=x"]).is_err());
    }
}
