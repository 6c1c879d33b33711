//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Manifest and icon on disk, plus a place for the packaged output.
pub struct TestFixture {
    pub dir: TempDir,
}

/// Result of one `appimage-tool` run.
#[derive(Debug)]
pub struct TestResult {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for TestResult {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl TestFixture {
    pub fn new(manifest: &str) -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("manifest.json"), manifest)?;
        std::fs::write(dir.path().join("icon.png"), b"\x89PNG")?;
        Ok(Self { dir })
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn output(&self) -> PathBuf {
        self.path("out.AppImage")
    }

    /// Run the binary with `/bin/sh -c <script>` standing in for appimagetool.
    ///
    /// Inside `script`, `$1` is the AppDir and `$2` the output path.
    pub fn run(&self, script: &str, extra: &[&str]) -> anyhow::Result<TestResult> {
        let mut command = self.command(Path::new("/bin/sh"));
        command
            .arg("--extra_arg=-c")
            .arg(format!("--extra_arg={script}"))
            .arg("--extra_arg=sh")
            .args(extra)
            .arg(self.output());
        Ok(command.output()?.into())
    }

    /// Base command with the required flags and a fixed packaging tool.
    pub fn command(&self, tool: &Path) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_appimage-tool"));
        command
            .env("APPIMAGE_TOOL", tool)
            .env_remove("RUNFILES_DIR")
            .env_remove("RUNFILES_MANIFEST_FILE")
            .env_remove("RUST_LOG")
            .arg("--manifest")
            .arg(self.path("manifest.json"))
            .arg("--workdir")
            .arg("AppDir")
            .arg("--entrypoint")
            .arg("AppDir/a.txt")
            .arg("--icon")
            .arg(self.path("icon.png"));
        command
    }
}
