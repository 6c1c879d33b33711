//! Packaging manifest produced by the build rules.
//!
//! Decoding is strict about shape (all three lists are required) and about
//! tree paths, which must stay inside the staging root. File sources and
//! symlink targets are left untouched.
use serde::Deserialize;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::ManifestError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileMapEntry {
    /// Destination relative to the staging root.
    pub dst: String,
    /// Source resolved against the working directory.
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SymlinkEntry {
    /// Link location relative to the staging root.
    pub linkname: String,
    /// Stored verbatim as the link target.
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub empty_files: Vec<String>,
    pub files: Vec<FileMapEntry>,
    pub symlinks: Vec<SymlinkEntry>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|source| ManifestError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    #[cfg(test)]
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest =
            serde_json::from_str(text).map_err(|source| ManifestError::Decode {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        for path in &self.empty_files {
            check_tree_path("empty_files", path)?;
        }
        for entry in &self.files {
            check_tree_path("files.dst", &entry.dst)?;
        }
        for entry in &self.symlinks {
            check_tree_path("symlinks.linkname", &entry.linkname)?;
        }
        Ok(())
    }
}

fn check_tree_path(field: &'static str, raw: &str) -> Result<(), ManifestError> {
    normalize_tree_path(raw).map(|_| ()).map_err(|reason| ManifestError::InvalidPath {
        field,
        value: raw.to_string(),
        reason,
    })
}

/// Lexically normalise a tree path: `.` is dropped and `..` pops a component.
///
/// The result never escapes the root it is later joined onto.
pub fn normalize_tree_path(raw: &str) -> Result<PathBuf, &'static str> {
    if raw.is_empty() {
        return Err("path must not be empty");
    }
    let mut cleaned = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => cleaned.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    return Err("path escapes the staging root");
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err("path must be relative");
            }
        }
    }
    if cleaned.as_os_str().is_empty() {
        return Err("path names the staging root itself");
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_sections_in_order() {
        let manifest = Manifest::parse(
            r#"{
                "empty_files": ["AppDir/a.txt", "AppDir/b/__init__.py"],
                "files": [{"dst": "AppDir/bin/app", "src": "bazel-out/bin/app"}],
                "symlinks": [{"linkname": "AppDir/link", "target": "a.txt"}],
                "unused": true
            }"#,
        )
        .expect("parse manifest");

        assert_eq!(
            manifest.empty_files,
            vec!["AppDir/a.txt", "AppDir/b/__init__.py"]
        );
        assert_eq!(
            manifest.files,
            vec![FileMapEntry {
                dst: "AppDir/bin/app".to_string(),
                src: "bazel-out/bin/app".to_string(),
            }]
        );
        assert_eq!(manifest.symlinks[0].target, "a.txt");
    }

    #[test]
    fn missing_section_is_a_decode_error() {
        let err = Manifest::parse(r#"{"empty_files": [], "files": []}"#)
            .expect_err("symlinks is required");
        match err {
            ManifestError::Decode { source, .. } => {
                assert!(source.to_string().contains("symlinks"), "{source}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = Manifest::parse("{\"empty_files\": [").expect_err("malformed");
        assert!(matches!(err, ManifestError::Decode { .. }));
    }

    #[test]
    fn entry_missing_field_is_a_decode_error() {
        let err = Manifest::parse(
            r#"{"empty_files": [], "files": [{"dst": "AppDir/x"}], "symlinks": []}"#,
        )
        .expect_err("src is required");
        assert!(matches!(err, ManifestError::Decode { .. }));
    }

    #[test]
    fn absolute_and_escaping_tree_paths_are_rejected() {
        let err =
            Manifest::parse(r#"{"empty_files": ["/etc/passwd"], "files": [], "symlinks": []}"#)
                .expect_err("absolute");
        assert!(matches!(
            err,
            ManifestError::InvalidPath {
                field: "empty_files",
                ..
            }
        ));

        let err = Manifest::parse(
            r#"{"empty_files": [], "files": [], "symlinks": [{"linkname": "AppDir/../../x", "target": "y"}]}"#,
        )
        .expect_err("escaping");
        assert!(matches!(
            err,
            ManifestError::InvalidPath {
                field: "symlinks.linkname",
                ..
            }
        ));
    }

    #[test]
    fn symlink_targets_and_sources_are_not_validated() {
        let manifest = Manifest::parse(
            r#"{"empty_files": [], "files": [{"dst": "AppDir/x", "src": "/abs/../src"}],
                "symlinks": [{"linkname": "AppDir/l", "target": "../../outside"}]}"#,
        )
        .expect("parse");
        assert_eq!(manifest.files[0].src, "/abs/../src");
        assert_eq!(manifest.symlinks[0].target, "../../outside");
    }

    #[test]
    fn normalize_tree_path_drops_dot_and_pops_parent() {
        assert_eq!(
            normalize_tree_path("AppDir/./a/../b").expect("normalize"),
            PathBuf::from("AppDir/b")
        );
        assert!(normalize_tree_path("").is_err());
        assert!(normalize_tree_path("AppDir/..").is_err());
        assert!(normalize_tree_path("..").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Manifest::load(&dir.path().join("missing.json")).expect_err("missing");
        assert!(matches!(err, ManifestError::Read { .. }));
    }
}
