//! Materialise a manifest into the staging root.
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::path::{Component, Path, PathBuf};

use crate::error::{AssembleError, ManifestError};
use crate::manifest::{normalize_tree_path, Manifest};

/// Symlinks followed while resolving one path, matching Linux `MAXSYMLINKS`.
const MAX_LINK_HOPS: usize = 40;

/// Create every manifest entry under `root`, in manifest order: empty files,
/// then copied files, then symlinks.
pub fn materialize(root: &Path, manifest: &Manifest) -> Result<(), AssembleError> {
    for rel_path in &manifest.empty_files {
        let path = tree_path(root, "empty_files", rel_path)?;
        ensure_parent(&path)?;
        touch(&path)?;
        tracing::debug!(path = %path.display(), "created empty file");
    }
    for entry in &manifest.files {
        let dst = tree_path(root, "files.dst", &entry.dst)?;
        let src = Path::new(&entry.src);
        let src = src.canonicalize().map_err(|source| AssembleError::Copy {
            src: src.to_path_buf(),
            dst: dst.clone(),
            source,
        })?;
        ensure_parent(&dst)?;
        copy_following_links(&src, &dst)?;
        tracing::debug!(src = %src.display(), dst = %dst.display(), "copied file");
    }
    for entry in &manifest.symlinks {
        // Earlier links may sit on the parent path; create the directory they point at.
        let link = tree_path(root, "symlinks.linkname", &entry.linkname)?;
        let link = resolve_parent_in_tree(root, &link)?;
        ensure_parent(&link)?;
        create_symlink(&entry.target, &link)?;
        tracing::debug!(link = %link.display(), target = %entry.target, "created symlink");
    }
    tracing::info!(
        empty_files = manifest.empty_files.len(),
        files = manifest.files.len(),
        symlinks = manifest.symlinks.len(),
        "staging tree assembled"
    );
    Ok(())
}

/// Copy `src` to `dst`, reading through symlinks at `src`.
pub fn copy_following_links(src: &Path, dst: &Path) -> Result<(), AssembleError> {
    fs::copy(src, dst).map_err(|source| AssembleError::Copy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn ensure_parent(path: &Path) -> Result<(), AssembleError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| AssembleError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

fn tree_path(
    root: &Path,
    field: &'static str,
    rel_path: &str,
) -> Result<PathBuf, AssembleError> {
    let cleaned =
        normalize_tree_path(rel_path).map_err(|reason| ManifestError::InvalidPath {
            field,
            value: rel_path.to_string(),
            reason,
        })?;
    Ok(root.join(cleaned))
}

/// Resolve the parent of `path` through symlinks already created under `root`.
///
/// Links may dangle, in which case the path they name is returned so the
/// caller can create it. Resolution never leaves `root`.
fn resolve_parent_in_tree(root: &Path, path: &Path) -> Result<PathBuf, AssembleError> {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Ok(path.to_path_buf());
    };
    let rel = parent.strip_prefix(root).map_err(|_| AssembleError::Resolve {
        path: path.to_path_buf(),
        reason: "path is outside the staging root",
    })?;

    let mut pending: Vec<OsString> = Vec::new();
    push_components(&mut pending, rel);
    let mut resolved = PathBuf::new();
    let mut hops = 0;
    while let Some(part) = pending.pop() {
        if part == ".." {
            if !resolved.pop() {
                return Err(AssembleError::Resolve {
                    path: path.to_path_buf(),
                    reason: "symlink escapes the staging root",
                });
            }
            continue;
        }
        let candidate = resolved.join(&part);
        let on_disk = root.join(&candidate);
        let is_link =
            fs::symlink_metadata(&on_disk).is_ok_and(|meta| meta.file_type().is_symlink());
        if !is_link {
            resolved = candidate;
            continue;
        }
        hops += 1;
        if hops > MAX_LINK_HOPS {
            return Err(AssembleError::Resolve {
                path: path.to_path_buf(),
                reason: "too many levels of symbolic links",
            });
        }
        let target = fs::read_link(&on_disk).map_err(|source| AssembleError::ReadLink {
            path: on_disk.clone(),
            source,
        })?;
        let target = if target.is_absolute() {
            resolved = PathBuf::new();
            target
                .strip_prefix(root)
                .map_err(|_| AssembleError::Resolve {
                    path: path.to_path_buf(),
                    reason: "symlink escapes the staging root",
                })?
                .to_path_buf()
        } else {
            target
        };
        push_components(&mut pending, &target);
    }
    Ok(root.join(resolved).join(name))
}

/// Push `path`'s components so the first one is popped next.
fn push_components(pending: &mut Vec<OsString>, path: &Path) {
    for component in path.components().rev() {
        match component {
            Component::Normal(part) => pending.push(part.to_os_string()),
            Component::ParentDir => pending.push(OsString::from("..")),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
}

fn touch(path: &Path) -> Result<(), AssembleError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AssembleError::Touch {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

fn create_symlink(target: &str, link: &Path) -> Result<(), AssembleError> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(|source| AssembleError::Link {
            link: link.to_path_buf(),
            target: target.to_string(),
            source,
        })
    }
    #[cfg(not(unix))]
    {
        Err(AssembleError::Link {
            link: link.to_path_buf(),
            target: target.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "symlinks are unsupported on this platform",
            ),
        })
    }
}
