//! Build script embedding git and build metadata at compile time.
//!
//! Sets `cargo:rustc-env` variables read by the `/health` handler via
//! `env!()`. Falls back to `"unknown"` when git is unavailable (e.g.
//! Docker builds without `.git`).

use std::process::Command;

/// Try an override env var first (for Docker builds), then fall back to git.
fn git_or_env(env_key: &str, args: &[&str]) -> String {
    std::env::var(env_key)
        .ok()
        .filter(|s| !s.is_empty() && s != "unknown")
        .unwrap_or_else(|| {
            Command::new("git")
                .args(args)
                .output()
                .ok()
                .filter(|o| o.status.success())
                .and_then(|o| String::from_utf8(o.stdout).ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "unknown".into())
        })
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed=HYDRA_GIT_SHORT_OVERRIDE");

    println!(
        "cargo:rustc-env=HYDRA_GIT_SHORT={}",
        git_or_env("HYDRA_GIT_SHORT_OVERRIDE", &["rev-parse", "--short", "HEAD"])
    );

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".into());
    println!("cargo:rustc-env=HYDRA_BUILD_PROFILE={profile}");
}
