use std::process::Command;

fn main() {
    // Short git commit hash, "unknown" outside of a checkout
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!(
        "cargo:rustc-env=CLI_VERSION={}-{}",
        env!("CARGO_PKG_VERSION"),
        git_hash
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
}
