use assert_cmd::Command;
use std::ffi::OsStr;
use std::path::PathBuf;
use tempfile::TempDir;

/// A scratch directory the binary runs in, isolated from the caller's
/// workspace and user config.
pub struct AatWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl AatWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    /// A workspace with `aat init` already run.
    pub fn initialized() -> Self {
        let workspace = Self::new();
        workspace.command().arg("init").assert().success();
        workspace
    }

    /// A workspace with the checkbox bundle imported.
    pub fn with_checkbox_bundle() -> Self {
        let workspace = Self::initialized();
        workspace
            .command()
            .arg("import")
            .arg(super::fixtures::checkbox_bundle_path())
            .assert()
            .success();
        workspace
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("aat"));
        cmd.current_dir(&self.root);
        cmd.env("NO_COLOR", "1");
        cmd.env("HOME", &self.root);
        cmd.env("RUST_LOG", "aria_at_rust=debug");
        cmd.env_remove("ARIA_AT_DIR");
        for key in ["AAT_DB", "AAT_JSON", "AAT_MISALIGNED_RESULTS", "AAT_ASSEMBLER", "AAT_LOCK_TIMEOUT"] {
            cmd.env_remove(key);
        }
        cmd
    }

    pub fn run<I, S>(&self, args: I) -> std::process::Output
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command().args(args).output().expect("run aat")
    }

    /// Run with `--json` and parse stdout.
    pub fn run_json<I, S>(&self, args: I) -> serde_json::Value
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.command().args(args).arg("--json").output().expect("run aat");
        assert!(
            output.status.success(),
            "aat failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is JSON")
    }
}

/// Parse the structured error printed to stderr.
pub fn stderr_json(output: &std::process::Output) -> serde_json::Value {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr
        .find("{\n  \"error\"")
        .expect("stderr carries a JSON error");
    let end = stderr.rfind('}').expect("stderr carries a JSON error");
    serde_json::from_str(&stderr[start..=end]).expect("stderr error is JSON")
}
