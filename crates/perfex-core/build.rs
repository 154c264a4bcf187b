//! Embeds the source revision as `GIT_SHA` for the version string.
//!
//! Packagers building outside a git checkout set `PERFEX_GIT_SHA`.

use std::env;
use std::process::Command;

const OVERRIDE: &str = "PERFEX_GIT_SHA";

fn describe() -> Option<String> {
    let out = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let rev = String::from_utf8(out.stdout).ok()?;
    let rev = rev.trim();
    (!rev.is_empty()).then(|| rev.to_owned())
}

fn main() {
    let rev = env::var(OVERRIDE)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(describe)
        .unwrap_or_else(|| "unknown".to_owned());

    println!("cargo:rustc-env=GIT_SHA={rev}");
    println!("cargo:rerun-if-env-changed={OVERRIDE}");
    for watched in ["HEAD", "index"] {
        println!("cargo:rerun-if-changed=../../.git/{watched}");
    }
}
