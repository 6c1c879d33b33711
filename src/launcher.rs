//! Synthesised AppDir entrypoint files: `AppRun`, `AppRun.desktop` and the icon.
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::AssembleError;
use crate::staging::copy_following_links;

pub const APPDIR: &str = "AppDir";
pub const APPRUN: &str = "AppRun";
pub const APPRUN_MODE: u32 = 0o751;

pub const DESKTOP_ENTRY: &str = "\
[Desktop Entry]
Type=Application
Name=AppRun
Exec=AppRun
Icon=AppRun
Categories=Development;
Terminal=true
";

/// Workdir and entrypoint, relative to `AppDir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    pub workdir: PathBuf,
    pub entrypoint: PathBuf,
}

impl LauncherPaths {
    pub fn new(workdir: &Path, entrypoint: &Path) -> Result<Self, AssembleError> {
        Ok(Self {
            workdir: relative_to_appdir("workdir", workdir)?,
            entrypoint: relative_to_appdir("entrypoint", entrypoint)?,
        })
    }
}

fn relative_to_appdir(arg: &'static str, path: &Path) -> Result<PathBuf, AssembleError> {
    let cleaned: PathBuf = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();
    let rel = cleaned
        .strip_prefix(APPDIR)
        .map_err(|_| AssembleError::OutsideAppDir {
            arg,
            path: path.to_path_buf(),
        })?;
    if rel.as_os_str().is_empty() {
        return Ok(PathBuf::from("."));
    }
    Ok(rel.to_path_buf())
}

pub fn render_apprun(paths: &LauncherPaths) -> String {
    format!(
        "#!/bin/sh\n\
         set -eu\n\
         HERE=\"$(dirname $0)\"\n\
         cd \"${{HERE}}/{workdir}\"\n\
         exec \"{entrypoint}\" \"$@\"\n",
        workdir = paths.workdir.display(),
        entrypoint = paths.entrypoint.display(),
    )
}

/// Write `AppRun` (mode 0751) and `AppRun.desktop` into `appdir`.
pub fn write_launcher(appdir: &Path, paths: &LauncherPaths) -> Result<PathBuf, AssembleError> {
    let apprun = appdir.join(APPRUN);
    write_text(&apprun, &render_apprun(paths))?;
    set_mode(&apprun, APPRUN_MODE)?;
    write_text(&apprun.with_extension("desktop"), DESKTOP_ENTRY)?;
    tracing::debug!(
        workdir = %paths.workdir.display(),
        entrypoint = %paths.entrypoint.display(),
        "wrote launcher"
    );
    Ok(apprun)
}

/// Copy the icon to `AppRun<suffix>`, keeping the icon's extension.
pub fn install_icon(appdir: &Path, icon: &Path) -> Result<PathBuf, AssembleError> {
    let name = match icon.extension() {
        Some(ext) => format!("{APPRUN}.{}", ext.to_string_lossy()),
        None => APPRUN.to_string(),
    };
    let dst = appdir.join(name);
    copy_following_links(icon, &dst)?;
    Ok(dst)
}

fn write_text(path: &Path, text: &str) -> Result<(), AssembleError> {
    fs::write(path, text).map_err(|source| AssembleError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn set_mode(path: &Path, mode: u32) -> Result<(), AssembleError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
            AssembleError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Ok(())
    }
}
