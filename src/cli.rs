//! CLI argument parsing for the AppImage packaging step.
//!
//! The CLI is intentionally thin: it collects paths and flags and hands them
//! to the assembler, so the same core logic can be driven from tests.
use clap::Parser;
use std::path::PathBuf;

/// Root CLI entrypoint.
///
/// Flag spellings are fixed by the build rules that invoke this tool, which
/// is why `--extra_arg` keeps its underscore.
#[derive(Parser, Debug)]
#[command(
    name = "appimage-tool",
    version,
    about = "Assemble an AppDir from a manifest and package it with appimagetool",
    long_about = "Assemble an AppDir from a manifest and package it with appimagetool.\n\nWrites the built AppImage to OUTPUT and exits with appimagetool's exit code.",
    after_help = "Environment:\n  APPIMAGE_TOOL           Path to appimagetool, overriding runfiles lookup\n  RUNFILES_DIR            Runfiles tree used to locate appimagetool\n  RUNFILES_MANIFEST_FILE  Runfiles manifest used to locate appimagetool\n  RUST_LOG                Log filter for diagnostics on stderr (default: warn)\n\nExample:\n  appimage-tool --manifest app-manifest.json --workdir AppDir/app.runfiles/main \\\n    --entrypoint AppDir/app --icon icon.png --extra_arg=--no-appstream app.AppImage"
)]
pub struct RootArgs {
    /// Path to manifest json with file and link definitions, e.g. 'bazel-out/k8-fastbuild/bin/tests/appimage_py-manifest.json'
    #[arg(long, value_name = "PATH", value_parser = existing_path)]
    pub manifest: PathBuf,

    /// Path to working dir, e.g. 'AppDir/tests/test_py.runfiles/rules_appimage'
    #[arg(long, value_name = "PATH")]
    pub workdir: PathBuf,

    /// Path to entrypoint, e.g. 'AppDir/tests/test_py'
    #[arg(long, value_name = "PATH")]
    pub entrypoint: PathBuf,

    /// Icon to use in the AppImage, e.g. 'external/AppImageKit/resources/appimagetool.png'
    #[arg(long, value_name = "PATH", value_parser = existing_path)]
    pub icon: PathBuf,

    /// Any extra arg to pass to appimagetool, e.g. '--no-appstream'. Can be used multiple times.
    #[arg(
        long = "extra_arg",
        value_name = "VALUE",
        allow_hyphen_values = true,
        action = clap::ArgAction::Append
    )]
    pub extra_args: Vec<String>,

    /// Don't print appimagetool output unless there is an error
    #[arg(long)]
    pub quiet: bool,

    /// Where to write the built AppImage
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
}

fn existing_path(raw: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("path '{raw}' does not exist"))
    }
}
