//! The isolated location chosen for one install run.

use crate::schemas::container_marker::{ContainerMarker, MARKER_FILE_NAME};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Name of the lock file kept next to the container inside the candidate root.
pub const LOCK_FILE_NAME: &str = ".pkm-bootstrap.lock";

/// Directory (inside the container) holding the unpacked payload.
pub const PAYLOAD_DIR_NAME: &str = "payload";

/// Directory (inside the container) holding the launcher.
pub const BIN_DIR_NAME: &str = "bin";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallTarget {
    /// The candidate root the container lives in.
    pub candidate: PathBuf,
    /// The container itself: `<candidate>/<package_name>`.
    pub root: PathBuf,
    pub command_name: String,
    /// The marker of the install being replaced, if this run is an upgrade.
    pub prior: Option<ContainerMarker>,
}

impl InstallTarget {
    pub fn new(candidate: &Path, package_name: &str, command_name: &str, prior: Option<ContainerMarker>) -> Self {
        InstallTarget {
            candidate: candidate.to_path_buf(),
            root: candidate.join(package_name),
            command_name: command_name.to_string(),
            prior,
        }
    }

    pub fn payload_dir(&self) -> PathBuf {
        self.root.join(PAYLOAD_DIR_NAME)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join(BIN_DIR_NAME)
    }

    /// Published launcher path.
    pub fn launcher(&self) -> PathBuf {
        self.bin_dir().join(launcher_file_name(&self.command_name))
    }

    pub fn marker_path(&self) -> PathBuf {
        self.root.join(MARKER_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.candidate.join(LOCK_FILE_NAME)
    }

    pub fn is_upgrade(&self) -> bool {
        self.prior.is_some()
    }
}

/// File name of the launcher for `command` on this platform.
pub fn launcher_file_name(command: &str) -> String {
    if cfg!(windows) {
        format!("{command}.cmd")
    } else {
        command.to_string()
    }
}
