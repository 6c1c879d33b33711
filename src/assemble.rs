//! Build one AppImage: stage the AppDir, synthesise its entrypoint, run the
//! packaging tool and hand back its exit code.
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::error::AssembleError;
use crate::launcher::{install_icon, write_launcher, LauncherPaths, APPDIR};
use crate::manifest::Manifest;
use crate::staging::materialize;
use crate::tool::{run_tool, ToolLocator};

/// Inputs for a single packaging run, mirroring the CLI flags.
#[derive(Debug, Clone)]
pub struct AppImageRequest {
    pub manifest: PathBuf,
    pub workdir: PathBuf,
    pub entrypoint: PathBuf,
    pub icon: PathBuf,
    pub extra_args: Vec<String>,
    pub output: PathBuf,
    pub quiet: bool,
}

/// Assemble the AppDir and package it, writing tool output to stdout.
///
/// Returns the packaging tool's exit code.
pub fn make_appimage(
    request: &AppImageRequest,
    locator: &dyn ToolLocator,
) -> Result<i32, AssembleError> {
    let stdout = std::io::stdout();
    make_appimage_to(request, locator, &mut stdout.lock())
}

/// Like [`make_appimage`], printing tool output to `out`.
pub fn make_appimage_to(
    request: &AppImageRequest,
    locator: &dyn ToolLocator,
    out: &mut dyn Write,
) -> Result<i32, AssembleError> {
    let manifest = Manifest::load(&request.manifest)?;
    let launcher = LauncherPaths::new(&request.workdir, &request.entrypoint)?;
    let tool = locator.locate()?;

    let staging = tempfile::Builder::new()
        .prefix("appimage-")
        .tempdir()
        .map_err(AssembleError::Staging)?;
    let appdir = staging.path().join(APPDIR);
    tracing::debug!(root = %staging.path().display(), "created staging root");

    materialize(staging.path(), &manifest)?;
    fs::create_dir_all(&appdir).map_err(|source| AssembleError::CreateDir {
        path: appdir.clone(),
        source,
    })?;
    write_launcher(&appdir, &launcher)?;
    install_icon(&appdir, &request.icon)?;

    let result = run_tool(&tool, &request.extra_args, &appdir, &request.output)?;
    if !request.quiet || result.code != 0 {
        if let Err(err) = writeln!(out, "{}", result.output) {
            tracing::warn!(error = %err, "failed to print packaging output");
        }
    }

    let root = staging.path().to_path_buf();
    if let Err(err) = staging.close() {
        tracing::warn!(root = %root.display(), error = %err, "failed to remove staging root");
    }
    Ok(result.code)
}
