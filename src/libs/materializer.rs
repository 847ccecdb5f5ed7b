//! MATERIALIZING stage: stage-then-commit publication of a container.
//!
//! Everything is assembled in a staging directory created next to the container
//! (same filesystem), checked, and only then published with `rename`. A container
//! being replaced is renamed to a backup first, so there is never a moment where
//! a half-written container sits at the published path. The returned
//! [`Publication`] keeps the backup until the run commits; rolling back restores it.

use crate::error::{BootstrapError, Result};
use crate::libs::launcher::{render_launcher, write_launcher};
use crate::libs::payload_source::Payload;
use crate::libs::utilities::file_operations::{is_executable, make_executable, remove_dir_if_exists};
use crate::libs::utilities::timestamps::{current_timestamp, file_stamp};
use crate::libs::utilities::versions::parse_lenient;
use crate::schemas::container_marker::{ContainerMarker, MARKER_SCHEMA_VERSION};
use crate::schemas::install_target::{launcher_file_name, InstallTarget, BIN_DIR_NAME, PAYLOAD_DIR_NAME};
use crate::schemas::payload_manifest::PayloadManifest;
use crate::{log_debug, log_error, log_info, log_warn};
use colored::Colorize;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of [`materialize`].
#[derive(Debug)]
pub enum Materialized {
    /// A new container is published and awaits verification.
    Published(Publication),
    /// The same version is already installed and `force` was not set. Nothing was written.
    AlreadyInstalled(ContainerMarker),
}

/// A published container that can still be rolled back.
///
/// Dropping a `Publication` without calling [`commit`](Publication::commit) rolls it back.
#[derive(Debug)]
pub struct Publication {
    root: PathBuf,
    backup: Option<PathBuf>,
    marker: ContainerMarker,
    previous_version: Option<String>,
    settled: bool,
}

impl Publication {
    pub fn marker(&self) -> &ContainerMarker {
        &self.marker
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Version of the container that was replaced, if any.
    pub fn previous_version(&self) -> Option<&str> {
        self.previous_version.as_deref()
    }

    /// Makes the publication permanent and discards the backup.
    pub fn commit(mut self) -> ContainerMarker {
        self.settled = true;
        if let Some(backup) = self.backup.take() {
            if let Err(e) = remove_dir_if_exists(&backup) {
                log_warn!(
                    "[Materialize] Could not remove backup {}: {}",
                    backup.display().to_string().yellow(),
                    e
                );
            }
        }
        log_debug!("[Materialize] Committed {}", self.root.display());
        self.marker.clone()
    }

    /// Removes the published container and puts the previous one (if any) back.
    pub fn rollback(mut self) -> Result<()> {
        self.settled = true;
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        log_warn!(
            "[Materialize] Rolling back {}",
            self.root.display().to_string().yellow()
        );
        // Move the failed container out of the way first so the slot is freed atomically.
        let discard = sibling_path(&self.root, "discard");
        if self.root.exists() {
            fs::rename(&self.root, &discard)
                .map_err(|e| BootstrapError::io(format!("failed to move aside {}", self.root.display()), e))?;
        }
        if let Some(backup) = self.backup.take() {
            fs::rename(&backup, &self.root)
                .map_err(|e| BootstrapError::io(format!("failed to restore {}", backup.display()), e))?;
            log_info!("[Materialize] Restored previous container");
        }
        remove_dir_if_exists(&discard)
            .map_err(|e| BootstrapError::io(format!("failed to remove {}", discard.display()), e))
    }
}

impl Drop for Publication {
    fn drop(&mut self) {
        if !self.settled {
            if let Err(e) = self.restore() {
                log_error!("[Materialize] Rollback failed: {}", e);
            }
        }
    }
}

/// Stages the payload, builds the container around it, and publishes it at `target.root`.
///
/// # Arguments
/// * `target`: Where to publish. `target.prior` drives upgrade and downgrade handling.
/// * `payload`: The payload to install.
/// * `runtime`: Interpreter the launcher is bound to.
/// * `force`: Reinstall the same version, or allow a downgrade.
///
/// The caller must hold the install lock for `target`.
pub fn materialize(
    target: &InstallTarget,
    payload: &Payload,
    runtime: Option<&Path>,
    force: bool,
) -> Result<Materialized> {
    fs::create_dir_all(&target.candidate)
        .map_err(|e| BootstrapError::io(format!("failed to create {}", target.candidate.display()), e))?;

    let staging = tempfile::Builder::new()
        .prefix(".pkm-staging-")
        .tempdir_in(&target.candidate)
        .map_err(|e| BootstrapError::io(format!("failed to create staging area in {}", target.candidate.display()), e))?;
    log_debug!(
        "[Materialize] Staging in {}",
        staging.path().display().to_string().cyan()
    );

    let staged_payload = staging.path().join(PAYLOAD_DIR_NAME);
    payload.unpack_into(&staged_payload)?;
    let manifest = PayloadManifest::load(&staged_payload)?;
    log_info!(
        "[Materialize] Payload {} {}",
        manifest.name.cyan(),
        manifest.version.green()
    );

    if let Some(prior) = &target.prior {
        if let Some(skip) = compare_with_prior(prior, &manifest, force)? {
            return Ok(skip);
        }
    }

    if manifest.native {
        make_executable(&staged_payload.join(&manifest.entry))
            .map_err(|e| BootstrapError::io(format!("failed to mark {} executable", manifest.entry), e))?;
    }

    let launcher_source = render_launcher(&target.root, &manifest, runtime)?;
    let staged_launcher = staging
        .path()
        .join(BIN_DIR_NAME)
        .join(launcher_file_name(&target.command_name));
    write_launcher(&staged_launcher, &launcher_source)?;

    let now = current_timestamp();
    let marker = ContainerMarker {
        schema_version: MARKER_SCHEMA_VERSION,
        name: manifest.name.clone(),
        version: manifest.version.clone(),
        command_name: target.command_name.clone(),
        launcher: target.launcher(),
        entry: manifest.entry.clone(),
        runtime: if manifest.native { None } else { runtime.map(Path::to_path_buf) },
        entry_path: payload.entry_path.clone(),
        payload_sha256: payload.sha256.clone(),
        installed_at: target
            .prior
            .as_ref()
            .map(|p| p.installed_at.clone())
            .unwrap_or_else(|| now.clone()),
        updated_at: now,
        bootstrap_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    marker.save(staging.path())?;
    check_staged(staging.path(), &staged_launcher, &marker)?;

    let backup = move_prior_aside(target)?;
    if let Err(e) = fs::rename(staging.path(), &target.root) {
        if let Some(backup) = &backup {
            if let Err(restore) = fs::rename(backup, &target.root) {
                log_error!(
                    "[Materialize] Could not restore {} from {}: {}",
                    target.root.display(),
                    backup.display(),
                    restore
                );
            }
        }
        return Err(BootstrapError::io(
            format!("failed to publish container at {}", target.root.display()),
            e,
        ));
    }
    log_info!(
        "[Materialize] Published {}",
        target.root.display().to_string().green()
    );

    Ok(Materialized::Published(Publication {
        root: target.root.clone(),
        backup,
        marker,
        previous_version: target.prior.as_ref().map(|p| p.version.clone()),
        settled: false,
    }))
}

// `Some` when the run should stop without writing anything.
fn compare_with_prior(prior: &ContainerMarker, manifest: &PayloadManifest, force: bool) -> Result<Option<Materialized>> {
    let ordering = match (parse_lenient(&prior.version), parse_lenient(&manifest.version)) {
        (Some(installed), Some(incoming)) => incoming.cmp(&installed),
        _ => prior.version.cmp(&manifest.version).reverse(),
    };
    match ordering {
        Ordering::Equal if !force => {
            log_info!(
                "[Materialize] pkm {} is already installed. Use --force to reinstall.",
                prior.version.green()
            );
            Ok(Some(Materialized::AlreadyInstalled(prior.clone())))
        }
        Ordering::Less if !force => Err(BootstrapError::DowngradeRefused {
            installed: prior.version.clone(),
            requested: manifest.version.clone(),
        }),
        _ => Ok(None),
    }
}

fn check_staged(staging: &Path, launcher: &Path, marker: &ContainerMarker) -> Result<()> {
    if !is_executable(launcher) {
        return Err(BootstrapError::InvalidPayload {
            reason: format!("staged launcher {} is not executable", launcher.display()),
        });
    }
    match ContainerMarker::load(staging)? {
        Some(on_disk) if &on_disk == marker => Ok(()),
        _ => Err(BootstrapError::InvalidPayload {
            reason: "staged container marker does not match".to_string(),
        }),
    }
}

// Renames the container being replaced out of the published path.
fn move_prior_aside(target: &InstallTarget) -> Result<Option<PathBuf>> {
    if !target.root.exists() {
        return Ok(None);
    }
    // Only ever displace a directory this tool created.
    if ContainerMarker::load(&target.root)?.is_none() {
        return Err(BootstrapError::ConflictDetected {
            reason: format!(
                "{} appeared during the install and is not a pkm container",
                target.root.display()
            ),
        });
    }
    let backup = sibling_path(&target.root, "backup");
    fs::rename(&target.root, &backup)
        .map_err(|e| BootstrapError::io(format!("failed to back up {}", target.root.display()), e))?;
    log_debug!("[Materialize] Previous container moved to {}", backup.display());
    Ok(Some(backup))
}

/// A hidden path next to `root`, unique to this process, e.g. `.pkm-backup-20261016T103045-4242`.
fn sibling_path(root: &Path, purpose: &str) -> PathBuf {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    root.with_file_name(format!(".{name}-{purpose}-{}-{}", file_stamp(), std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::payload_source::PayloadSource;
    use crate::schemas::container_marker::EntryPath;
    use tempfile::tempdir;

    fn payload_dir(parent: &Path, version: &str) -> PathBuf {
        let dir = parent.join(format!("payload-{version}"));
        fs::create_dir_all(dir.join("pkm")).unwrap();
        fs::write(dir.join("pkm/__main__.py"), "print('pkm')\n").unwrap();
        fs::write(
            dir.join("pkm-payload.toml"),
            format!("name = \"pkm\"\nversion = \"{version}\"\nentry = \"pkm/__main__.py\"\n"),
        )
        .unwrap();
        dir
    }

    fn payload(parent: &Path, version: &str) -> Payload {
        Payload::delegated(PayloadSource::Directory(payload_dir(parent, version)), "pip").unwrap()
    }

    fn published(result: Materialized) -> Publication {
        match result {
            Materialized::Published(p) => p,
            Materialized::AlreadyInstalled(m) => panic!("unexpected no-op for {}", m.version),
        }
    }

    fn hidden_entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with('.'))
            .collect()
    }

    const PYTHON: &str = "/usr/bin/python3";

    #[test]
    fn fresh_install_publishes_a_complete_container() {
        let tmp = tempdir().unwrap();
        let target = InstallTarget::new(&tmp.path().join("arena"), "pkm", "pkm", None);
        let publication =
            published(materialize(&target, &payload(tmp.path(), "0.4.0"), Some(Path::new(PYTHON)), false).unwrap());
        let marker = publication.commit();

        assert!(is_executable(&target.launcher()));
        assert!(target.payload_dir().join("pkm/__main__.py").is_file());
        assert_eq!(ContainerMarker::load(&target.root).unwrap(), Some(marker.clone()));
        assert_eq!(marker.installed_at, marker.updated_at);
        assert_eq!(marker.entry_path, EntryPath::Delegated { manager: "pip".into() });
        assert!(hidden_entries(&target.candidate).is_empty());
    }

    #[test]
    fn upgrade_keeps_installed_at_and_single_container() {
        let tmp = tempdir().unwrap();
        let candidate = tmp.path().join("arena");
        let first = InstallTarget::new(&candidate, "pkm", "pkm", None);
        let old = published(materialize(&first, &payload(tmp.path(), "0.3.0"), Some(Path::new(PYTHON)), false).unwrap())
            .commit();

        let second = InstallTarget::new(&candidate, "pkm", "pkm", Some(old.clone()));
        let publication =
            published(materialize(&second, &payload(tmp.path(), "0.4.0"), Some(Path::new(PYTHON)), false).unwrap());
        assert_eq!(publication.previous_version(), Some("0.3.0"));
        let new = publication.commit();

        assert_eq!(new.version, "0.4.0");
        assert_eq!(new.installed_at, old.installed_at);
        let entries: Vec<_> = fs::read_dir(&candidate).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn same_version_is_a_no_op_unless_forced() {
        let tmp = tempdir().unwrap();
        let candidate = tmp.path().join("arena");
        let first = InstallTarget::new(&candidate, "pkm", "pkm", None);
        let old = published(materialize(&first, &payload(tmp.path(), "0.4.0"), Some(Path::new(PYTHON)), false).unwrap())
            .commit();

        let again = InstallTarget::new(&candidate, "pkm", "pkm", Some(old));
        let p = payload(tmp.path(), "0.4.0");
        assert!(matches!(
            materialize(&again, &p, Some(Path::new(PYTHON)), false).unwrap(),
            Materialized::AlreadyInstalled(_)
        ));
        assert!(hidden_entries(&candidate).is_empty());
        published(materialize(&again, &p, Some(Path::new(PYTHON)), true).unwrap()).commit();
    }

    #[test]
    fn downgrade_requires_force() {
        let tmp = tempdir().unwrap();
        let candidate = tmp.path().join("arena");
        let first = InstallTarget::new(&candidate, "pkm", "pkm", None);
        let old = published(materialize(&first, &payload(tmp.path(), "0.4.0"), Some(Path::new(PYTHON)), false).unwrap())
            .commit();

        let target = InstallTarget::new(&candidate, "pkm", "pkm", Some(old));
        let err = materialize(&target, &payload(tmp.path(), "0.3.0"), Some(Path::new(PYTHON)), false).unwrap_err();
        assert!(matches!(err, BootstrapError::DowngradeRefused { .. }));
    }

    #[test]
    fn rollback_restores_the_previous_container() {
        let tmp = tempdir().unwrap();
        let candidate = tmp.path().join("arena");
        let first = InstallTarget::new(&candidate, "pkm", "pkm", None);
        let old = published(materialize(&first, &payload(tmp.path(), "0.3.0"), Some(Path::new(PYTHON)), false).unwrap())
            .commit();

        let target = InstallTarget::new(&candidate, "pkm", "pkm", Some(old.clone()));
        published(materialize(&target, &payload(tmp.path(), "0.4.0"), Some(Path::new(PYTHON)), false).unwrap())
            .rollback()
            .unwrap();

        assert_eq!(ContainerMarker::load(&target.root).unwrap(), Some(old));
        assert!(hidden_entries(&candidate).is_empty());
    }

    #[test]
    fn dropped_publication_of_fresh_install_leaves_nothing() {
        let tmp = tempdir().unwrap();
        let target = InstallTarget::new(&tmp.path().join("arena"), "pkm", "pkm", None);
        drop(materialize(&target, &payload(tmp.path(), "0.4.0"), Some(Path::new(PYTHON)), false).unwrap());
        assert!(!target.root.exists());
    }

    #[test]
    fn invalid_payload_never_reaches_the_published_path() {
        let tmp = tempdir().unwrap();
        let dir = payload_dir(tmp.path(), "0.4.0");
        fs::remove_file(dir.join("pkm-payload.toml")).unwrap();
        let target = InstallTarget::new(&tmp.path().join("arena"), "pkm", "pkm", None);
        let p = Payload::delegated(PayloadSource::Directory(dir), "pip").unwrap();

        assert!(matches!(
            materialize(&target, &p, Some(Path::new(PYTHON)), false),
            Err(BootstrapError::InvalidPayload { .. })
        ));
        assert!(!target.root.exists());
        assert!(hidden_entries(&target.candidate).is_empty());
    }

    #[test]
    fn foreign_directory_is_never_displaced() {
        let tmp = tempdir().unwrap();
        let candidate = tmp.path().join("arena");
        fs::create_dir_all(candidate.join("pkm")).unwrap();
        fs::write(candidate.join("pkm/notes.txt"), "mine").unwrap();
        let target = InstallTarget::new(&candidate, "pkm", "pkm", None);

        assert!(matches!(
            materialize(&target, &payload(tmp.path(), "0.4.0"), Some(Path::new(PYTHON)), false),
            Err(BootstrapError::ConflictDetected { .. })
        ));
        assert_eq!(fs::read_to_string(candidate.join("pkm/notes.txt")).unwrap(), "mine");
    }
}
