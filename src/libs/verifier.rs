//! VERIFYING stage: confirms a published container is what the target describes
//! and that it is isolated from everything else on the host.

use crate::error::{BootstrapError, Result};
use crate::libs::utilities::file_operations::{find_executables, is_executable};
use crate::libs::utilities::path_helpers::normalize_lexically;
use crate::schemas::bootstrap_config::VerifyConfig;
use crate::schemas::container_marker::ContainerMarker;
use crate::schemas::install_target::InstallTarget;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Checks the published container at `target.root`.
///
/// # Arguments
/// * `target`: The target the container was published for.
/// * `search_path`: PATH directories from the detected environment, used for the shadowing check.
/// * `options`: Whether to smoke-test the launcher, and with which timeout.
///
/// # Returns
/// The marker read back from disk.
///
/// # Errors
/// `ConflictDetected` for any failed check.
pub fn verify(target: &InstallTarget, search_path: &[PathBuf], options: &VerifyConfig) -> Result<ContainerMarker> {
    log_info!("[Verify] Checking {}", target.root.display().to_string().cyan());
    let launcher = target.launcher();

    if !is_executable(&launcher) {
        return Err(conflict(format!("launcher {} is missing or not executable", launcher.display())));
    }
    let root = normalize_lexically(&target.root);
    if !normalize_lexically(&launcher).starts_with(&root) {
        return Err(conflict(format!("launcher {} lies outside the container", launcher.display())));
    }

    let marker = ContainerMarker::load(&target.root)?
        .ok_or_else(|| conflict(format!("{} has no container marker", target.root.display())))?;
    if marker.command_name != target.command_name || marker.launcher != launcher {
        return Err(conflict(format!(
            "marker describes launcher {} but the target expects {}",
            marker.launcher.display(),
            launcher.display()
        )));
    }

    // Same command name elsewhere on PATH means one of the two shadows the other.
    let bin_dir = normalize_lexically(&target.bin_dir());
    let others: Vec<PathBuf> = find_executables(&target.command_name, search_path)
        .into_iter()
        .filter(|exe| !normalize_lexically(exe).starts_with(&bin_dir))
        .collect();
    if let Some(other) = others.first() {
        return Err(conflict(format!(
            "`{}` is also provided by {}",
            target.command_name,
            other.display()
        )));
    }

    if options.smoke_test {
        smoke_test(&launcher, Duration::from_secs(options.smoke_timeout_secs.max(1)))?;
    }

    log_info!(
        "[Verify] pkm {} is isolated and runnable via {}",
        marker.version.green(),
        launcher.display().to_string().cyan()
    );
    Ok(marker)
}

// Runs `<launcher> --version`, killing it after `timeout`.
fn smoke_test(launcher: &std::path::Path, timeout: Duration) -> Result<()> {
    log_debug!("[Verify] Smoke test: {} --version", launcher.display());
    let mut child = Command::new(launcher)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| conflict(format!("launcher {} cannot be started: {e}", launcher.display())))?;

    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => return Ok(()),
            Ok(Some(status)) => {
                return Err(conflict(format!("`{} --version` exited with {status}", launcher.display())));
            }
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                log_warn!("[Verify] Smoke test timed out after {:?}", timeout);
                return Err(conflict(format!(
                    "`{} --version` did not finish within {}s",
                    launcher.display(),
                    timeout.as_secs()
                )));
            }
            Ok(None) => thread::sleep(Duration::from_millis(50)),
            Err(e) => return Err(BootstrapError::io("failed to wait for smoke test", e)),
        }
    }
}

fn conflict(reason: String) -> BootstrapError {
    BootstrapError::ConflictDetected { reason }
}
