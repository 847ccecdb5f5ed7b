//! # Container Marker (`.pkm-container.json`)
//!
//! The marker sits at the root of every container the installer publishes. It
//! proves that the directory is a self-contained pkm install created by this
//! tool, which is what allows upgrades in place and uninstall to touch the
//! directory at all. A directory without a marker is never modified.
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "name": "pkm",
//!   "version": "0.4.0",
//!   "command_name": "pkm",
//!   "launcher": "/home/u/.local/share/pkm-bootstrap/pkm/bin/pkm",
//!   "entry": "pkm/__main__.py",
//!   "runtime": "/usr/bin/python3",
//!   "entry_path": { "kind": "script", "index_url": "https://pypi.org/pypi/pkm-cli/json" },
//!   "payload_sha256": "9f2c...",
//!   "installed_at": "2026-10-16T10:30:45+00:00",
//!   "updated_at": "2026-10-16T10:30:45+00:00",
//!   "bootstrap_version": "0.4.0"
//! }
//! ```

use crate::error::{BootstrapError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the marker inside a container root.
pub const MARKER_FILE_NAME: &str = ".pkm-container.json";

/// Current marker layout version.
pub const MARKER_SCHEMA_VERSION: u32 = 1;

/// Which front-end produced an install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryPath {
    /// The bootstrap fetched the payload from a release index itself.
    Script { index_url: String },
    /// Another package manager placed the payload on disk and handed it over.
    Delegated { manager: String },
}

impl std::fmt::Display for EntryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryPath::Script { .. } => f.write_str("script"),
            EntryPath::Delegated { manager } => write!(f, "delegated:{manager}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerMarker {
    pub schema_version: u32,
    pub name: String,
    pub version: String,
    pub command_name: String,
    /// Absolute path of the published launcher.
    pub launcher: PathBuf,
    /// Payload-relative path of the program the launcher starts.
    pub entry: String,
    /// Runtime the launcher is bound to; `None` for native payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<PathBuf>,
    pub entry_path: EntryPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_sha256: Option<String>,
    pub installed_at: String,
    pub updated_at: String,
    pub bootstrap_version: String,
}

impl ContainerMarker {
    /// Reads the marker from `container_root`. `Ok(None)` when there is no marker.
    pub fn load(container_root: &Path) -> Result<Option<ContainerMarker>> {
        let path = container_root.join(MARKER_FILE_NAME);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BootstrapError::io(
                    format!("failed to read marker {}", path.display()),
                    e,
                ));
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| BootstrapError::ConflictDetected {
                reason: format!(
                    "{} exists but is not a valid pkm container marker: {e}",
                    path.display()
                ),
            })
    }

    /// Writes the marker into `container_root` as pretty-printed JSON.
    pub fn save(&self, container_root: &Path) -> Result<()> {
        let path = container_root.join(MARKER_FILE_NAME);
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            BootstrapError::io("failed to serialize container marker", io::Error::other(e))
        })?;
        fs::write(&path, json)
            .map_err(|e| BootstrapError::io(format!("failed to write marker {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> ContainerMarker {
        ContainerMarker {
            schema_version: MARKER_SCHEMA_VERSION,
            name: "pkm".into(),
            version: "0.4.0".into(),
            command_name: "pkm".into(),
            launcher: PathBuf::from("/arena/pkm/bin/pkm"),
            entry: "pkm/__main__.py".into(),
            runtime: Some(PathBuf::from("/usr/bin/python3")),
            entry_path: EntryPath::Delegated { manager: "pip".into() },
            payload_sha256: None,
            installed_at: "2026-10-16T10:30:45+00:00".into(),
            updated_at: "2026-10-16T10:30:45+00:00".into(),
            bootstrap_version: "0.4.0".into(),
        }
    }

    #[test]
    fn missing_marker_is_none() {
        let tmp = tempdir().unwrap();
        assert!(ContainerMarker::load(tmp.path()).unwrap().is_none());
    }

    #[test]
    fn saved_marker_loads_back() {
        let tmp = tempdir().unwrap();
        let marker = sample();
        marker.save(tmp.path()).unwrap();
        assert_eq!(ContainerMarker::load(tmp.path()).unwrap(), Some(marker));
    }

    #[test]
    fn corrupt_marker_is_a_conflict() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join(MARKER_FILE_NAME), "{ not json").unwrap();
        let err = ContainerMarker::load(tmp.path()).unwrap_err();
        assert!(matches!(err, BootstrapError::ConflictDetected { .. }));
    }

    #[test]
    fn entry_path_is_tagged() {
        let json = serde_json::to_string(&EntryPath::Delegated { manager: "pip".into() }).unwrap();
        assert_eq!(json, r#"{"kind":"delegated","manager":"pip"}"#);
        assert_eq!(EntryPath::Delegated { manager: "pip".into() }.to_string(), "delegated:pip");
    }
}
