// Launcher generation.
// The launcher is the only entry point into a container. It binds the payload to
// one runtime and sets PKM_HOME, so pkm never resolves anything through shared
// search paths (site-packages, PYTHONPATH, other tools' bin directories).

use crate::error::{BootstrapError, Result};
use crate::libs::utilities::file_operations::make_executable;
use crate::log_debug;
use crate::schemas::install_target::PAYLOAD_DIR_NAME;
use crate::schemas::payload_manifest::PayloadManifest;
use colored::Colorize;
use std::fs;
use std::path::Path;

/// Header line that identifies a launcher written by this tool.
pub const LAUNCHER_SIGNATURE: &str = "pkm launcher generated by pkm-bootstrap";

/// Renders the launcher for a container published at `container_root`.
///
/// # Arguments
/// * `container_root`: Final (published) location of the container, not the staging path.
/// * `manifest`: The payload manifest; decides between runtime and native entry.
/// * `runtime`: The interpreter found on the host. Required unless the payload is native.
pub fn render_launcher(container_root: &Path, manifest: &PayloadManifest, runtime: Option<&Path>) -> Result<String> {
    let entry = container_root.join(PAYLOAD_DIR_NAME).join(&manifest.entry);

    let mut argv: Vec<String> = Vec::new();
    if !manifest.native {
        let runtime = runtime.ok_or_else(|| BootstrapError::InvalidPayload {
            reason: format!("{} needs a runtime but none was detected", manifest.name),
        })?;
        argv.push(runtime.display().to_string());
        argv.extend(manifest.runtime_args.iter().cloned());
    }
    argv.push(entry.display().to_string());

    let home = container_root.display().to_string();
    Ok(if cfg!(windows) {
        render_cmd(&home, &argv)
    } else {
        render_sh(&home, &argv)
    })
}

fn render_sh(home: &str, argv: &[String]) -> String {
    let command = argv.iter().map(|a| sh_quote(a)).collect::<Vec<_>>().join(" ");
    format!(
        "#!/bin/sh\n# {LAUNCHER_SIGNATURE}. Do not edit.\nPKM_HOME={}\nexport PKM_HOME\nexec {command} \"$@\"\n",
        sh_quote(home)
    )
}

fn render_cmd(home: &str, argv: &[String]) -> String {
    let command = argv
        .iter()
        .map(|a| format!("\"{a}\""))
        .collect::<Vec<_>>()
        .join(" ");
    format!("@echo off\r\nrem {LAUNCHER_SIGNATURE}. Do not edit.\r\nset \"PKM_HOME={home}\"\r\n{command} %*\r\n")
}

/// Single-quotes `value` for POSIX sh.
fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Writes the launcher to `path` and marks it executable.
pub fn write_launcher(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BootstrapError::io(format!("failed to create {}", parent.display()), e))?;
    }
    fs::write(path, contents)
        .and_then(|_| make_executable(path))
        .map_err(|e| BootstrapError::io(format!("failed to write launcher {}", path.display()), e))?;
    log_debug!("[Launcher] Wrote {}", path.display().to_string().cyan());
    Ok(())
}
