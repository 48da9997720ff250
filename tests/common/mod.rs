//! Helpers for driving the `qtest` binary against throwaway state.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub const CALC_PY: &str = "\
def add(a, b):
    return a + b


def sub(a, b):
    return a - b


def _private(x):
    return x
";

/// A temporary home, repository and working directory.
pub struct Sandbox {
    pub dir: tempfile::TempDir,
}

impl Sandbox {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            let path = dir.path().join("repo").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        Self { dir }
    }

    pub fn home(&self) -> PathBuf {
        self.dir.path().join("home")
    }

    pub fn repo(&self) -> PathBuf {
        self.dir.path().join("repo")
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_qtest"));
        cmd.args(args)
            .current_dir(self.dir.path())
            .env("QTEST_HOME", self.home())
            .env("QTEST_LOG", "warn")
            .env_remove("QTEST_RECORD")
            .env_remove("ANTHROPIC_API_KEY");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("failed to run qtest binary")
    }

    /// Runs `qtest init` on the sandbox repository and returns the workspace ID.
    pub fn init(&self) -> String {
        let repo = self.repo();
        let output = self.run(&["init", repo.to_str().unwrap(), "--name", "calc"]);
        assert!(output.status.success(), "init failed: {}", stderr(&output));
        let out = stdout(&output);
        out.strip_prefix("Created workspace ")
            .and_then(|rest| rest.split_whitespace().next())
            .expect("init prints the workspace ID")
            .to_string()
    }

    pub fn state(&self, id: &str) -> serde_json::Value {
        let raw = fs::read_to_string(self.home().join(id).join("workspace.json")).unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn only_subdir(dir: &Path) -> PathBuf {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    assert_eq!(dirs.len(), 1, "expected one directory in {}", dir.display());
    dirs.remove(0)
}
