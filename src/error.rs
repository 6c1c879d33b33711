use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Manifest could not be read or did not match the expected schema.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("read manifest {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("decode manifest {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("manifest {field} entry {value:?}: {reason}")]
    InvalidPath {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// The packaging binary could not be found.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("{var} points at {}, which does not exist", path.display())]
    MissingOverride { var: &'static str, path: PathBuf },
    #[error("read runfiles manifest {}", path.display())]
    RunfilesManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not locate {logical} (set APPIMAGE_TOOL or run under runfiles)")]
    NotFound { logical: &'static str },
}

/// Failures while assembling the AppDir or running the packaging binary.
///
/// A non-zero exit from the packaging binary is not an error; it is returned
/// as the exit code.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error("--{arg} {} is not inside AppDir", path.display())]
    OutsideAppDir { arg: &'static str, path: PathBuf },
    #[error("create staging directory")]
    Staging(#[source] io::Error),
    #[error("create {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("create empty file {}", path.display())]
    Touch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("copy {} to {}", src.display(), dst.display())]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("link {} -> {target}", link.display())]
    Link {
        link: PathBuf,
        target: String,
        #[source]
        source: io::Error,
    },
    #[error("resolve {} inside the staging root: {reason}", path.display())]
    Resolve { path: PathBuf, reason: &'static str },
    #[error("read link {}", path.display())]
    ReadLink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("capture packaging output")]
    Capture(#[source] io::Error),
    #[error("run {}", tool.display())]
    Spawn {
        tool: PathBuf,
        #[source]
        source: io::Error,
    },
}
