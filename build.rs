use std::env;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const VERSION_VAR: &str = "HTTP_UTILS_VERSION";

fn main() {
    println!("cargo:rerun-if-env-changed={}", VERSION_VAR);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    // An explicit version from the environment wins, then git, then Cargo.toml.
    let version = env::var(VERSION_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(git_version)
        .unwrap_or_else(|| format!("{}+{}", env!("CARGO_PKG_VERSION"), unix_seconds()));

    println!("cargo:rustc-env={}={}", VERSION_VAR, version);
}

/// `git describe` without the leading `v`; dirty trees get a build time suffix.
fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    let described = described.strip_prefix('v').unwrap_or(described);

    match described {
        "" => None,
        d if d.ends_with("-dirty") => Some(format!("{}.{}", d, unix_seconds())),
        d => Some(d.to_string()),
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
