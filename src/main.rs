use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

mod assemble;
mod cli;
mod error;
mod launcher;
mod logging;
mod manifest;
mod staging;
mod tool;

use assemble::{make_appimage, AppImageRequest};
use cli::RootArgs;
use tool::RunfilesLocator;

fn main() -> Result<ExitCode> {
    let args = RootArgs::parse();
    logging::init_logging();

    let output = args.output.clone();
    let request = AppImageRequest {
        manifest: args.manifest,
        workdir: args.workdir,
        entrypoint: args.entrypoint,
        icon: args.icon,
        extra_args: args.extra_args,
        output: args.output,
        quiet: args.quiet,
    };
    let code = make_appimage(&request, &RunfilesLocator::from_env())
        .with_context(|| format!("build AppImage {}", output.display()))?;
    Ok(ExitCode::from(exit_byte(code)))
}

/// Shells only see the low byte of an exit status; `-9` becomes 247.
fn exit_byte(code: i32) -> u8 {
    (code & 0xff) as u8
}
