//! Where a payload comes from, and how it is laid out inside a staging area.
//!
//! Both front-ends end up here: the script path hands over a downloaded archive,
//! the delegated path hands over whatever another package manager put on disk.

use crate::error::{BootstrapError, Result};
use crate::libs::utilities::compression::{extract_archive, single_top_level_dir};
use crate::libs::utilities::file_operations::{copy_dir_all, remove_dir_if_exists, sha256_file};
use crate::log_debug;
use crate::schemas::container_marker::EntryPath;
use crate::schemas::payload_manifest::MANIFEST_FILE_NAME;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadSource {
    /// An archive file (`.tar.gz`, `.zip`, `.whl`, ...).
    Archive(PathBuf),
    /// An already unpacked payload directory.
    Directory(PathBuf),
}

/// A payload ready to be materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub source: PayloadSource,
    pub entry_path: EntryPath,
    /// Digest of the archive, recorded in the container marker.
    pub sha256: Option<String>,
}

impl Payload {
    /// A payload downloaded by the script entry path, already checksummed.
    pub fn from_index(archive: PathBuf, index_url: &str, sha256: String) -> Payload {
        Payload {
            source: PayloadSource::Archive(archive),
            entry_path: EntryPath::Script {
                index_url: index_url.to_string(),
            },
            sha256: Some(sha256),
        }
    }

    /// A payload another package manager placed on disk. Archives are hashed
    /// so the marker records exactly what was installed.
    pub fn delegated(source: PayloadSource, manager: &str) -> Result<Payload> {
        let sha256 = match &source {
            PayloadSource::Archive(path) => {
                if !path.is_file() {
                    return Err(BootstrapError::InvalidPayload {
                        reason: format!("archive {} does not exist", path.display()),
                    });
                }
                Some(sha256_file(path).map_err(|e| BootstrapError::io(format!("failed to hash {}", path.display()), e))?)
            }
            PayloadSource::Directory(path) => {
                if !path.is_dir() {
                    return Err(BootstrapError::InvalidPayload {
                        reason: format!("payload directory {} does not exist", path.display()),
                    });
                }
                None
            }
        };
        Ok(Payload {
            source,
            entry_path: EntryPath::Delegated {
                manager: manager.to_string(),
            },
            sha256,
        })
    }

    /// Places the payload contents at `dest`, which must not exist yet.
    ///
    /// Archives are unpacked next to `dest` first. A single wrapping directory
    /// (`pkm-0.4.0/`) is dropped unless the manifest sits at the archive root.
    pub fn unpack_into(&self, dest: &Path) -> Result<()> {
        match &self.source {
            PayloadSource::Directory(src) => {
                copy_dir_all(src, dest).map_err(|e| BootstrapError::io(format!("failed to copy payload from {}", src.display()), e))
            }
            PayloadSource::Archive(archive) => {
                let unpack = dest.with_file_name(".unpack");
                extract_archive(archive, &unpack, None).map_err(|e| BootstrapError::InvalidPayload {
                    reason: format!("cannot unpack {}: {e}", archive.display()),
                })?;

                let root = if unpack.join(MANIFEST_FILE_NAME).is_file() {
                    unpack.clone()
                } else {
                    single_top_level_dir(&unpack)
                        .map_err(|e| BootstrapError::io(format!("failed to read {}", unpack.display()), e))?
                        .unwrap_or_else(|| unpack.clone())
                };
                log_debug!(
                    "[Payload] Using {} as payload root",
                    root.display().to_string().cyan()
                );
                fs::rename(&root, dest)
                    .map_err(|e| BootstrapError::io(format!("failed to move payload into {}", dest.display()), e))?;
                remove_dir_if_exists(&unpack)
                    .map_err(|e| BootstrapError::io(format!("failed to clean {}", unpack.display()), e))
            }
        }
    }
}
