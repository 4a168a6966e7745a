#![allow(dead_code)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Isolated data directory for driving the binary.
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    /// Environment whose first login does not insert sample tasks.
    pub fn unseeded() -> Self {
        let env = Self::new();
        env.write_config("[tasks]\nseed_sample_data = false\n")
            .expect("write config");
        env
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<()> {
        fs::write(self.dir.path().join("tasklify.toml"), contents)
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tasklify").expect("binary");
        cmd.env_remove("TASKLIFY_DATA_DIR")
            .env_remove("RUST_LOG")
            .arg("--data-dir")
            .arg(self.dir.path());
        cmd
    }

    /// Run with `--json` and parse stdout, whatever the exit status.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run tasklify");
        serde_json::from_slice(&output.stdout).expect("json output")
    }

    pub fn login(&self, username: &str) {
        self.cmd().args(["login", username]).assert().success();
    }

    /// Add a task and return its full id.
    pub fn add_task(&self, title: &str, category: &str, extra: &[&str]) -> String {
        let mut args = vec!["task", "add", title, "--category", category];
        args.extend_from_slice(extra);
        let value = self.json(&args);
        assert_eq!(value["status"], "success", "{value}");
        value["data"]["task"]["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }
}
