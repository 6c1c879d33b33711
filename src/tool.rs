//! Locating and running the external packaging binary (appimagetool).
//!
//! Location goes through [`ToolLocator`] so the surrounding build integration
//! decides where the binary lives; [`RunfilesLocator`] covers the usual
//! runfiles layouts plus an explicit override.
use std::env;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Instant;

use crate::error::{AssembleError, LocateError};

/// Runfiles path of the packaging binary.
pub const TOOL_LOGICAL_PATH: &str = "rules_appimage/appimage/private/tool/appimagetool.bin";
/// Environment override for the packaging binary.
pub const TOOL_OVERRIDE_ENV: &str = "APPIMAGE_TOOL";
const TOOL_PATH_NAME: &str = "appimagetool";

pub trait ToolLocator {
    fn locate(&self) -> Result<PathBuf, LocateError>;
}

/// Resolves [`TOOL_LOGICAL_PATH`] the way a runfiles library would.
///
/// Order: explicit override, `RUNFILES_DIR`, `RUNFILES_MANIFEST_FILE`,
/// `<exe>.runfiles/`, then `appimagetool` on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct RunfilesLocator {
    pub override_path: Option<PathBuf>,
    pub runfiles_dir: Option<PathBuf>,
    pub runfiles_manifest: Option<PathBuf>,
    pub exe: Option<PathBuf>,
    pub search_path: bool,
}

impl RunfilesLocator {
    pub fn from_env() -> Self {
        Self {
            override_path: env::var_os(TOOL_OVERRIDE_ENV).map(PathBuf::from),
            runfiles_dir: env::var_os("RUNFILES_DIR").map(PathBuf::from),
            runfiles_manifest: env::var_os("RUNFILES_MANIFEST_FILE").map(PathBuf::from),
            exe: env::current_exe().ok(),
            search_path: true,
        }
    }
}

impl ToolLocator for RunfilesLocator {
    fn locate(&self) -> Result<PathBuf, LocateError> {
        if let Some(path) = &self.override_path {
            if !path.exists() {
                return Err(LocateError::MissingOverride {
                    var: TOOL_OVERRIDE_ENV,
                    path: path.clone(),
                });
            }
            return Ok(path.clone());
        }
        if let Some(dir) = &self.runfiles_dir {
            let candidate = dir.join(TOOL_LOGICAL_PATH);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        if let Some(manifest) = &self.runfiles_manifest {
            if let Some(found) = lookup_runfiles_manifest(manifest, TOOL_LOGICAL_PATH)? {
                return Ok(found);
            }
        }
        if let Some(exe) = &self.exe {
            let mut dir = exe.clone().into_os_string();
            dir.push(".runfiles");
            let candidate = PathBuf::from(dir).join(TOOL_LOGICAL_PATH);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        if self.search_path {
            if let Ok(found) = which::which(TOOL_PATH_NAME) {
                return Ok(found);
            }
        }
        Err(LocateError::NotFound {
            logical: TOOL_LOGICAL_PATH,
        })
    }
}

/// Look up `logical` in a runfiles manifest (`<logical> <real>` per line).
fn lookup_runfiles_manifest(
    manifest: &Path,
    logical: &str,
) -> Result<Option<PathBuf>, LocateError> {
    let content =
        fs::read_to_string(manifest).map_err(|source| LocateError::RunfilesManifest {
            path: manifest.to_path_buf(),
            source,
        })?;
    Ok(content.lines().find_map(|line| {
        let (key, value) = line.split_once(' ')?;
        (key == logical && !value.is_empty()).then(|| PathBuf::from(value))
    }))
}

/// Exit code and merged stdout/stderr of one packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub code: i32,
    pub output: String,
}

/// Run `tool [extra_args..] <appdir> <output>` to completion.
///
/// stdout and stderr share one anonymous file, so the captured text keeps the
/// order in which the child wrote it.
pub fn run_tool(
    tool: &Path,
    extra_args: &[String],
    appdir: &Path,
    output: &Path,
) -> Result<ToolOutput, AssembleError> {
    let mut capture = tempfile::tempfile().map_err(AssembleError::Capture)?;
    let stdout = capture.try_clone().map_err(AssembleError::Capture)?;
    let stderr = capture.try_clone().map_err(AssembleError::Capture)?;

    let start = Instant::now();
    let status = Command::new(tool)
        .args(extra_args)
        .arg(appdir)
        .arg(output)
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .map_err(|source| AssembleError::Spawn {
            tool: tool.to_path_buf(),
            source,
        })?;
    let elapsed_ms = start.elapsed().as_millis();

    let text = read_capture(&mut capture).map_err(AssembleError::Capture)?;
    let code = exit_code(status);
    tracing::info!(
        elapsed_ms,
        code,
        output_bytes = text.len(),
        tool = %tool.display(),
        "packaging tool finished"
    );
    Ok(ToolOutput { code, output: text })
}

fn read_capture(capture: &mut File) -> std::io::Result<String> {
    capture.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    capture.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Exit code of the child; a signal death is reported as `-signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    1
}
