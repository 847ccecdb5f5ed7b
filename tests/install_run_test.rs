//! End-to-end install runs through the library API.
#![cfg(unix)]

mod common;

use common::{delegated_request, entries, payload_archive, probe, runtime_bin};
use pkm_bootstrap::error::{BootstrapError, Stage, EXIT_IN_PROGRESS};
use pkm_bootstrap::libs::bootstrap_run::{run_install, InstallRequest, Outcome, PayloadRequest};
use pkm_bootstrap::libs::host_probe::{HostProbe, StaticProbe};
use pkm_bootstrap::libs::install_lock::InstallLock;
use pkm_bootstrap::libs::utilities::file_operations::{is_executable, sha256_file};
use pkm_bootstrap::schemas::bootstrap_config::BootstrapConfig;
use pkm_bootstrap::schemas::container_marker::{ContainerMarker, EntryPath};
use pkm_bootstrap::schemas::install_target::LOCK_FILE_NAME;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Answers like `inner`, but runs `interleave` once from inside detection,
/// after the container slots were inspected and before the lock is taken.
struct InterleavingProbe {
    inner: StaticProbe,
    interleave: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl HostProbe for InterleavingProbe {
    fn os(&self) -> String {
        self.inner.os()
    }

    fn arch(&self) -> String {
        self.inner.arch()
    }

    fn search_path(&self) -> Vec<PathBuf> {
        self.inner.search_path()
    }

    fn var(&self, name: &str) -> Option<String> {
        self.inner.var(name)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.inner.home_dir()
    }

    fn runtime_version(&self, executable: &Path) -> Option<String> {
        self.inner.runtime_version(executable)
    }

    fn is_writable(&self, path: &Path) -> bool {
        let pending = self.interleave.borrow_mut().take();
        if let Some(interleave) = pending {
            interleave();
        }
        self.inner.is_writable(path)
    }
}

#[test]
fn fresh_install_creates_one_isolated_container() {
    let tmp = tempdir().unwrap();
    let probe = probe(tmp.path(), "3.11.4");
    let arena = tmp.path().join("arena");

    let report = run_install(
        &BootstrapConfig::default(),
        &[arena.clone()],
        &probe,
        &delegated_request(&tmp.path().join("dist"), "0.4.0"),
    )
    .unwrap();

    assert_eq!(report.outcome, Outcome::Installed { version: "0.4.0".into() });
    assert_eq!(report.target.root, arena.join("pkm"));
    assert!(is_executable(&arena.join("pkm/bin/pkm")));
    assert!(arena.join("pkm/payload/pkm/__main__.py").is_file());
    assert_eq!(entries(&arena), vec![LOCK_FILE_NAME.to_string(), "pkm".to_string()]);
    // Nothing was written outside the arena besides the fixtures themselves.
    assert_eq!(entries(tmp.path()), vec!["arena", "dist", "runtime-bin"]);

    let marker = ContainerMarker::load(&arena.join("pkm")).unwrap().unwrap();
    assert_eq!(marker.entry_path, EntryPath::Delegated { manager: "pip".into() });
    assert_eq!(marker.runtime, Some(tmp.path().join("runtime-bin/python3")));

    let launcher = fs::read_to_string(arena.join("pkm/bin/pkm")).unwrap();
    assert!(launcher.contains("'-I'"));
    assert!(launcher.contains(&format!("PKM_HOME='{}'", arena.join("pkm").display())));
}

#[test]
fn upgrade_in_place_leaves_a_single_install() {
    let tmp = tempdir().unwrap();
    let probe = probe(tmp.path(), "3.11.4");
    let arena = tmp.path().join("arena");
    let config = BootstrapConfig::default();
    let dist = tmp.path().join("dist");

    let first = run_install(&config, &[arena.clone()], &probe, &delegated_request(&dist, "0.3.0")).unwrap();
    let second = run_install(&config, &[arena.clone()], &probe, &delegated_request(&dist, "0.4.0")).unwrap();

    assert_eq!(
        second.outcome,
        Outcome::Upgraded {
            from: "0.3.0".into(),
            to: "0.4.0".into()
        }
    );
    assert_eq!(second.marker.installed_at, first.marker.installed_at);
    assert_eq!(entries(&arena), vec![LOCK_FILE_NAME.to_string(), "pkm".to_string()]);
    assert_eq!(entries(&arena.join("pkm/bin")), vec!["pkm"]);
    assert_eq!(
        ContainerMarker::load(&arena.join("pkm")).unwrap().unwrap().version,
        "0.4.0"
    );

    let again = run_install(&config, &[arena.clone()], &probe, &delegated_request(&dist, "0.4.0")).unwrap();
    assert_eq!(again.outcome, Outcome::AlreadyInstalled { version: "0.4.0".into() });
}

#[test]
fn failed_verification_restores_the_previous_install() {
    let tmp = tempdir().unwrap();
    let arena = tmp.path().join("arena");
    let dist = tmp.path().join("dist");
    let good = probe(tmp.path(), "3.11.4");
    run_install(&BootstrapConfig::default(), &[arena.clone()], &good, &delegated_request(&dist, "0.3.0")).unwrap();
    let before = fs::read(arena.join("pkm/.pkm-container.json")).unwrap();

    // A runtime that fails makes the launcher smoke test fail.
    let broken_root = tmp.path().join("broken");
    let mut broken = probe(&broken_root, "3.11.4");
    broken.search_path = vec![runtime_bin(&broken_root, 1)];
    let mut config = BootstrapConfig::default();
    config.verify.smoke_test = true;
    config.verify.smoke_timeout_secs = 10;

    let err = run_install(&config, &[arena.clone()], &broken, &delegated_request(&dist, "0.4.0")).unwrap_err();
    assert_eq!(err.stage, Stage::Verifying);
    assert!(matches!(err.source, BootstrapError::ConflictDetected { .. }));

    assert_eq!(fs::read(arena.join("pkm/.pkm-container.json")).unwrap(), before);
    assert_eq!(entries(&arena), vec![LOCK_FILE_NAME.to_string(), "pkm".to_string()]);
}

#[test]
fn corrupt_payload_fails_before_publishing() {
    let tmp = tempdir().unwrap();
    let arena = tmp.path().join("arena");
    let probe = probe(tmp.path(), "3.11.4");
    run_install(
        &BootstrapConfig::default(),
        &[arena.clone()],
        &probe,
        &delegated_request(&tmp.path().join("dist"), "0.3.0"),
    )
    .unwrap();

    let bogus = tmp.path().join("dist/pkm-0.4.0.tar.gz");
    fs::write(&bogus, b"not an archive").unwrap();
    let request = InstallRequest {
        payload: PayloadRequest::Local(
            pkm_bootstrap::libs::payload_source::Payload::delegated(
                pkm_bootstrap::libs::payload_source::PayloadSource::Archive(bogus),
                "pip",
            )
            .unwrap(),
        ),
        force: false,
    };
    let err = run_install(&BootstrapConfig::default(), &[arena.clone()], &probe, &request).unwrap_err();
    assert_eq!(err.stage, Stage::Materializing);
    assert_eq!(
        ContainerMarker::load(&arena.join("pkm")).unwrap().unwrap().version,
        "0.3.0"
    );
    assert_eq!(entries(&arena), vec![LOCK_FILE_NAME.to_string(), "pkm".to_string()]);
}

#[test]
fn unsupported_runtime_fails_before_any_write() {
    let tmp = tempdir().unwrap();
    let arena = tmp.path().join("arena");
    let probe = probe(tmp.path(), "3.7.9");

    let err = run_install(
        &BootstrapConfig::default(),
        &[arena.clone()],
        &probe,
        &delegated_request(&tmp.path().join("dist"), "0.4.0"),
    )
    .unwrap_err();

    assert_eq!(err.stage, Stage::Detecting);
    assert!(matches!(err.source, BootstrapError::UnsupportedRuntime { .. }));
    assert!(!arena.exists());
}

#[test]
fn concurrent_run_reports_install_in_progress() {
    let tmp = tempdir().unwrap();
    let arena = tmp.path().join("arena");
    let probe = probe(tmp.path(), "3.11.4");
    let held = InstallLock::acquire(&arena.join(LOCK_FILE_NAME), "install").unwrap();
    let lock_before = fs::read(arena.join(LOCK_FILE_NAME)).unwrap();

    let err = run_install(
        &BootstrapConfig::default(),
        &[arena.clone()],
        &probe,
        &delegated_request(&tmp.path().join("dist"), "0.4.0"),
    )
    .unwrap_err();

    assert!(matches!(err.source, BootstrapError::InstallInProgress { .. }));
    assert_eq!(err.exit_code(), EXIT_IN_PROGRESS);
    assert_eq!(entries(&arena), vec![LOCK_FILE_NAME.to_string()]);
    assert_eq!(fs::read(arena.join(LOCK_FILE_NAME)).unwrap(), lock_before);
    drop(held);
}

#[test]
fn script_path_installs_from_a_release_index() {
    let tmp = tempdir().unwrap();
    let arena = tmp.path().join("arena");
    let probe = probe(tmp.path(), "3.11.4");
    let dist = tmp.path().join("dist");
    let archive = payload_archive(&dist, "0.4.0");
    let old = payload_archive(&dist, "0.3.0");
    let digest = sha256_file(&archive).unwrap();

    let index = dist.join("index.json");
    fs::write(
        &index,
        format!(
            r#"{{"releases": {{
                "0.3.0": [{{"filename": "pkm-0.3.0.tar.gz", "url": "file://{}"}}],
                "0.4.0": [{{"filename": "pkm-0.4.0.tar.gz", "url": "file://{}",
                            "digests": {{"sha256": "{digest}"}}}}]
            }}}}"#,
            old.display(),
            archive.display()
        ),
    )
    .unwrap();
    let url = format!("file://{}", index.display());

    let request = InstallRequest {
        payload: PayloadRequest::Index {
            url: url.clone(),
            version: "latest".into(),
        },
        force: false,
    };
    let report = run_install(&BootstrapConfig::default(), &[arena.clone()], &probe, &request).unwrap();
    assert_eq!(report.outcome, Outcome::Installed { version: "0.4.0".into() });
    assert_eq!(report.marker.entry_path, EntryPath::Script { index_url: url });
    assert_eq!(report.marker.payload_sha256.as_deref(), Some(digest.as_str()));
    assert_eq!(entries(&arena), vec![LOCK_FILE_NAME.to_string(), "pkm".to_string()]);
}

#[test]
fn checksum_mismatch_aborts_before_publishing() {
    let tmp = tempdir().unwrap();
    let arena = tmp.path().join("arena");
    let probe = probe(tmp.path(), "3.11.4");
    let dist = tmp.path().join("dist");
    let archive = payload_archive(&dist, "0.4.0");
    let index = dist.join("index.json");
    fs::write(
        &index,
        format!(
            r#"{{"releases": {{"0.4.0": [{{"filename": "pkm-0.4.0.tar.gz", "url": "file://{}",
                "digests": {{"sha256": "{}"}}}}]}}}}"#,
            archive.display(),
            "0".repeat(64)
        ),
    )
    .unwrap();

    let request = InstallRequest {
        payload: PayloadRequest::Index {
            url: format!("file://{}", index.display()),
            version: "0.4.0".into(),
        },
        force: false,
    };
    let err = run_install(&BootstrapConfig::default(), &[arena.clone()], &probe, &request).unwrap_err();
    assert_eq!(err.stage, Stage::Materializing);
    assert!(matches!(err.source, BootstrapError::ChecksumMismatch { .. }));
    assert_eq!(entries(&arena), vec![LOCK_FILE_NAME.to_string()]);
}

#[test]
fn install_published_during_detection_is_not_downgraded() {
    let tmp = tempdir().unwrap();
    let arena = tmp.path().join("arena");
    let dist = tmp.path().join("dist");
    let plain = probe(tmp.path(), "3.11.4");
    let older = delegated_request(&dist, "0.3.0");
    let newer = delegated_request(&dist, "0.4.0");

    let other_arena = arena.clone();
    let other_probe = plain.clone();
    let racing = InterleavingProbe {
        inner: plain,
        interleave: RefCell::new(Some(Box::new(move || {
            let report = run_install(&BootstrapConfig::default(), &[other_arena], &other_probe, &newer).unwrap();
            assert_eq!(report.outcome, Outcome::Installed { version: "0.4.0".into() });
        }))),
    };

    let err = run_install(&BootstrapConfig::default(), &[arena.clone()], &racing, &older).unwrap_err();
    assert_eq!(err.stage, Stage::Materializing);
    assert!(matches!(err.source, BootstrapError::DowngradeRefused { .. }));

    let marker = ContainerMarker::load(&arena.join("pkm")).unwrap().unwrap();
    assert_eq!(marker.version, "0.4.0");
    assert_eq!(entries(&arena), vec![LOCK_FILE_NAME.to_string(), "pkm".to_string()]);
}

#[test]
fn unwritable_existing_install_is_not_duplicated_elsewhere() {
    let tmp = tempdir().unwrap();
    let first = tmp.path().join("a");
    let second = tmp.path().join("b");
    let dist = tmp.path().join("dist");
    let config = BootstrapConfig::default();
    run_install(&config, &[first.clone()], &probe(tmp.path(), "3.11.4"), &delegated_request(&dist, "0.3.0")).unwrap();

    let mut locked_down = probe(tmp.path(), "3.11.4");
    locked_down.read_only.push(first.clone());
    let err = run_install(
        &config,
        &[first.clone(), second.clone()],
        &locked_down,
        &delegated_request(&dist, "0.4.0"),
    )
    .unwrap_err();

    assert_eq!(err.stage, Stage::TargetResolved);
    assert!(matches!(err.source, BootstrapError::ConflictDetected { .. }));
    assert!(!second.exists());
    assert_eq!(
        ContainerMarker::load(&first.join("pkm")).unwrap().unwrap().version,
        "0.3.0"
    );
}
