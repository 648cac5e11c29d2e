use std::process::Command;

/// Embed the release version as APP_VERSION: `AGILE_VERSION` when set (CI and
/// Docker builds), else the latest git tag, else the package version.
fn main() {
    let version = std::env::var("AGILE_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(latest_tag)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=APP_VERSION={}", version);
    println!("cargo:rerun-if-env-changed=AGILE_VERSION");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/tags");
}

fn latest_tag() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--abbrev=0"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let tag = String::from_utf8(output.stdout).ok()?;
    let tag = tag.trim();
    Some(tag.strip_prefix('v').unwrap_or(tag).to_string())
}
