#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

pub fn bumpgate_cmd() -> assert_cmd::Command {
    cargo_bin_cmd!("bumpgate")
}

pub fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

pub fn manifest(name: &str, version: &str, description: &str) -> String {
    format!(
        "{{\n  \"name\": \"{name}\",\n  \"version\": \"{version}\",\n  \"description\": \"{description}\"\n}}\n"
    )
}

pub fn manifest_path(name: &str) -> String {
    format!("plugins/{name}/.claude-plugin/plugin.json")
}

/// A committed monorepo with one plugin per name, each at version 1.0.0.
pub fn setup_repo(plugins: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    git(dir, &["init", "-q"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["config", "commit.gpgsign", "false"]);

    let claude_dir = dir.join(".claude-plugin");
    std::fs::create_dir_all(&claude_dir).unwrap();
    std::fs::write(
        claude_dir.join("marketplace.json"),
        r#"{"name": "test-marketplace", "pluginRoot": "./plugins", "plugins": []}"#,
    )
    .unwrap();

    for name in plugins {
        write(dir, &manifest_path(name), &manifest(name, "1.0.0", "test plugin"));
        write(dir, &format!("plugins/{name}/commands/run.md"), "# run\n");
    }

    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", "initial"]);
    tmp
}
