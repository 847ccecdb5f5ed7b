//! One install run:
//! `DETECTING -> TARGET_RESOLVED -> MATERIALIZING -> VERIFYING -> INSTALLED | FAILED`.
//!
//! Both front-ends end here. The script path passes [`PayloadRequest::Index`] and
//! the payload is fetched once the lock is held; the delegated path passes a
//! payload already on disk. Nothing is retried: a failure reports its stage and
//! a new invocation starts over from detection.

use crate::error::{BootstrapError, Stage, StageError};
use crate::libs::environment_detection::detect_environment;
use crate::libs::host_probe::HostProbe;
use crate::libs::install_lock::InstallLock;
use crate::libs::materializer::{materialize, Materialized};
use crate::libs::package_index::{download_release_file, fetch_index};
use crate::libs::payload_source::Payload;
use crate::libs::target_resolver::resolve_install_target;
use crate::libs::verifier::verify;
use crate::schemas::bootstrap_config::BootstrapConfig;
use crate::schemas::container_marker::ContainerMarker;
use crate::schemas::host_environment::{ContainerSlot, HostEnvironment};
use crate::schemas::install_target::InstallTarget;
use crate::{log_debug, log_error, log_info, log_warn};
use colored::Colorize;
use std::path::PathBuf;

/// What to install.
#[derive(Debug, Clone)]
pub enum PayloadRequest {
    /// Delegated entry path: another package manager already placed the payload on disk.
    Local(Payload),
    /// Script entry path: look `version` ("latest" or exact) up in the release index.
    Index { url: String, version: String },
}

#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub payload: PayloadRequest,
    /// Reinstall the same version or allow a downgrade.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Installed { version: String },
    Upgraded { from: String, to: String },
    /// Same version already present; nothing was written.
    AlreadyInstalled { version: String },
}

/// The `INSTALLED` end state.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: Outcome,
    pub target: InstallTarget,
    pub marker: ContainerMarker,
}

/// Drives one install run through every stage.
///
/// # Arguments
/// * `config`: Loaded configuration.
/// * `candidates`: Candidate roots, most preferred first.
/// * `probe`: Host facts for detection.
/// * `request`: Payload and options.
///
/// # Returns
/// A [`RunReport`] when the run reaches `INSTALLED`, otherwise the stage it failed in.
pub fn run_install(
    config: &BootstrapConfig,
    candidates: &[PathBuf],
    probe: &dyn HostProbe,
    request: &InstallRequest,
) -> Result<RunReport, StageError> {
    let mut stage = Stage::Detecting;
    log_debug!("[Run] Entering {}", stage);
    let env = detect_environment(config, candidates, probe).map_err(|e| fail(stage, e))?;

    stage = Stage::TargetResolved;
    log_debug!("[Run] Entering {}", stage);
    let target = resolve_install_target(&env).map_err(|e| fail(stage, e))?;

    stage = Stage::Materializing;
    log_debug!("[Run] Entering {}", stage);
    // Held until the end of the run, verification included.
    let _lock = InstallLock::acquire(&target.lock_path(), "install").map_err(|e| fail(stage, e))?;
    let target = recheck_under_lock(&env, target).map_err(|e| fail(stage, e))?;
    let materialized = materialize_request(config, &env, &target, request).map_err(|e| fail(stage, e))?;
    let publication = match materialized {
        Materialized::AlreadyInstalled(marker) => {
            return Ok(RunReport {
                outcome: Outcome::AlreadyInstalled {
                    version: marker.version.clone(),
                },
                target,
                marker,
            });
        }
        Materialized::Published(publication) => publication,
    };

    stage = Stage::Verifying;
    log_debug!("[Run] Entering {}", stage);
    if let Err(e) = verify(&target, &env.search_path, &config.verify) {
        if let Err(rollback) = publication.rollback() {
            log_error!("[Run] Rollback after failed verification also failed: {}", rollback);
        }
        return Err(fail(stage, e));
    }

    let outcome = match publication.previous_version() {
        Some(from) => Outcome::Upgraded {
            from: from.to_string(),
            to: publication.marker().version.clone(),
        },
        None => Outcome::Installed {
            version: publication.marker().version.clone(),
        },
    };
    let marker = publication.commit();
    log_info!("[Run] {}", "INSTALLED".green().bold());
    Ok(RunReport { outcome, target, marker })
}

fn materialize_request(
    config: &BootstrapConfig,
    env: &HostEnvironment,
    target: &InstallTarget,
    request: &InstallRequest,
) -> Result<Materialized, BootstrapError> {
    let runtime = env.runtime.as_ref().map(|rt| rt.path.as_path());
    match &request.payload {
        PayloadRequest::Local(payload) => materialize(target, payload, runtime, request.force),
        PayloadRequest::Index { url, version } => {
            let index = fetch_index(url, config.network.timeout_secs)?;
            let (selected, file) = index.select(version, &env.os, &env.arch)?;
            log_info!(
                "[Run] Selected pkm {} ({})",
                selected.raw.green(),
                file.filename
            );
            // Downloads live next to the container so nothing is written outside the candidate root.
            let downloads = tempfile::Builder::new()
                .prefix(".pkm-download-")
                .tempdir_in(&target.candidate)
                .map_err(|e| BootstrapError::io("failed to create download directory", e))?;
            let (archive, sha256) = download_release_file(&file, downloads.path(), config.network.timeout_secs)?;
            let payload = Payload::from_index(archive, url, sha256);
            materialize(target, &payload, runtime, request.force)
        }
    }
}

/// Re-reads the containers once the lock is held. Another run may have published
/// between detection and locking; its marker, not the detected one, is what this
/// run upgrades from.
fn recheck_under_lock(env: &HostEnvironment, target: InstallTarget) -> Result<InstallTarget, BootstrapError> {
    for candidate in &env.candidate_roots {
        let container = candidate.path.join(&env.package_name);
        if container == target.root || candidate.container == ContainerSlot::Installed {
            continue;
        }
        if let Ok(Some(marker)) = ContainerMarker::load(&container) {
            return Err(BootstrapError::ConflictDetected {
                reason: format!(
                    "pkm {} was installed at {} while this run was starting",
                    marker.version,
                    container.display()
                ),
            });
        }
    }

    let current = ContainerMarker::load(&target.root)?;
    if current == target.prior {
        return Ok(target);
    }
    match &current {
        Some(marker) => log_warn!(
            "[Run] {} changed since detection and now holds pkm {}",
            target.root.display().to_string().yellow(),
            marker.version.yellow()
        ),
        None => log_warn!(
            "[Run] {} no longer holds a pkm container",
            target.root.display().to_string().yellow()
        ),
    }
    let command_name = current
        .as_ref()
        .map_or(target.command_name.as_str(), |m| m.command_name.as_str())
        .to_string();
    Ok(InstallTarget::new(&target.candidate, &env.package_name, &command_name, current))
}

fn fail(stage: Stage, source: BootstrapError) -> StageError {
    log_error!("[Run] {} failed: {}", stage, source);
    StageError::new(stage, source)
}
