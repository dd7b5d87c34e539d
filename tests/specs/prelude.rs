//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for testing the `collabot` CLI and `collabotd`
//! daemon, grounded on the teacher's `tests/specs/prelude.rs` (same
//! `CliBuilder`/`RunAssert`/`Project` shapes), narrowed to what Collabot's
//! method table needs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

// Aggressive timeouts for fast tests.
const COLLABOT_TIMEOUT_CONNECT_MS: &str = "2000";
const COLLABOT_TIMEOUT_IPC_MS: &str = "1000";

pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

/// Returns the path to a binary, checking the llvm-cov target directory
/// first, then the standard one, then falling back to the test binary's own
/// directory (the test binary lives at target/debug/deps/specs-<hash>, so
/// its grandparent is target/debug/ where `collabot` and `collabotd` live).
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn collabot_binary() -> PathBuf {
    binary_path("collabot")
}

pub fn collabotd_binary() -> PathBuf {
    binary_path("collabotd")
}

/// Returns a Command configured to run the `collabot` binary.
pub fn collabot_cmd() -> Command {
    Command::new(collabot_binary())
}

/// Create a CLI builder for `collabot` commands.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions.
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                ("COLLABOT_DAEMON_BIN".into(), collabotd_binary().to_string_lossy().into()),
                ("COLLABOT_TIMEOUT_CONNECT_MS".into(), COLLABOT_TIMEOUT_CONNECT_MS.into()),
                ("COLLABOT_TIMEOUT_IPC_MS".into(), COLLABOT_TIMEOUT_IPC_MS.into()),
            ],
        }
    }

    /// Add CLI arguments.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set the working directory.
    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string_lossy().to_string()));
        self
    }

    /// Build the command without running it.
    pub fn command(self) -> Command {
        let mut cmd = collabot_cmd();
        cmd.args(&self.args);

        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    /// Run and expect success (exit code 0).
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code).
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(!stdout.contains(unexpected), "stdout should not contain '{unexpected}'\nstdout: {stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain '{expected}'\nstderr: {stderr}");
        self
    }
}

/// Poll a condition until it returns true or the timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// Temporary test project directory with an isolated daemon state dir.
pub struct Project {
    state_dir: tempfile::TempDir,
}

impl Project {
    /// Create an empty project with a fresh, isolated state directory.
    pub fn empty() -> Self {
        Self { state_dir: tempfile::tempdir().expect("tempdir should create") }
    }

    /// The isolated state directory path (`COLLABOT_STATE_DIR`).
    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Run a `collabot` command scoped to this project's state directory.
    pub fn collabot(&self) -> CliBuilder {
        cli().env("COLLABOT_STATE_DIR", self.state_path())
    }

    /// Kill the daemon with SIGKILL (simulates a crash).
    pub fn daemon_kill(&self) -> bool {
        let pid_file = self.state_path().join("daemon.pid");
        let Ok(content) = std::fs::read_to_string(&pid_file) else {
            return false;
        };
        let Ok(pid) = content.trim().parse::<u32>() else {
            return false;
        };
        Command::new("kill")
            .args(["-9", &pid.to_string()])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let mut cmd = self.collabot().args(&["daemon", "stop"]).command();
        cmd.stdout(std::process::Stdio::null()).stderr(std::process::Stdio::null());
        let _ = cmd.status();
    }
}
