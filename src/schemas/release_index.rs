//! # Release Index
//!
//! The script entry path locates payloads through a JSON release index in the
//! PyPI layout:
//!
//! ```json
//! {
//!   "info": { "name": "pkm-cli", "version": "0.4.0" },
//!   "releases": {
//!     "0.4.0": [
//!       { "filename": "pkm_cli-0.4.0.tar.gz",
//!         "url": "https://files.example/pkm_cli-0.4.0.tar.gz",
//!         "digests": { "sha256": "9f2c..." },
//!         "yanked": false }
//!     ]
//!   }
//! }
//! ```

use crate::error::{BootstrapError, Result};
use crate::libs::utilities::platform::{asset_matches_platform, is_neutral_archive};
use crate::libs::utilities::versions::parse_lenient;
use semver::Version;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseIndex {
    #[serde(default)]
    pub info: Option<IndexInfo>,
    #[serde(default)]
    pub releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReleaseFile {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub digests: HashMap<String, String>,
    #[serde(default)]
    pub yanked: bool,
}

impl ReleaseFile {
    pub fn sha256(&self) -> Option<&str> {
        self.digests.get("sha256").map(String::as_str)
    }
}

/// A version string from the index together with its parsed form.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVersion {
    pub raw: String,
    pub parsed: Version,
}

impl ReleaseIndex {
    /// Versions that have at least one installable file, oldest first.
    /// Versions that do not parse, and versions whose files are all yanked, are skipped.
    pub fn versions(&self) -> Vec<IndexedVersion> {
        let mut versions: Vec<IndexedVersion> = self
            .releases
            .iter()
            .filter(|(_, files)| files.iter().any(|f| !f.yanked))
            .filter_map(|(raw, _)| {
                parse_lenient(raw).map(|parsed| IndexedVersion {
                    raw: raw.clone(),
                    parsed,
                })
            })
            .collect();
        versions.sort_by(|a, b| a.parsed.cmp(&b.parsed));
        versions
    }

    /// The newest stable version, or the newest pre-release when nothing stable exists.
    pub fn latest(&self) -> Option<IndexedVersion> {
        let versions = self.versions();
        versions
            .iter()
            .rev()
            .find(|v| v.parsed.pre.is_empty())
            .or_else(|| versions.last())
            .cloned()
    }

    /// Resolves `requested` ("latest" or a version) and picks the payload file for
    /// the given platform: a platform-specific build first, then a neutral archive.
    pub fn select(&self, requested: &str, os: &str, arch: &str) -> Result<(IndexedVersion, ReleaseFile)> {
        let version = if requested.eq_ignore_ascii_case("latest") {
            self.latest()
        } else {
            let wanted = parse_lenient(requested);
            self.versions()
                .into_iter()
                .find(|v| v.raw == requested || (wanted.is_some() && Some(&v.parsed) == wanted.as_ref()))
        }
        .ok_or_else(|| BootstrapError::VersionNotFound {
            requested: requested.to_string(),
        })?;

        let files: Vec<&ReleaseFile> = self.releases[&version.raw].iter().filter(|f| !f.yanked).collect();
        let file = files
            .iter()
            .find(|f| asset_matches_platform(&f.filename, os, arch))
            .or_else(|| files.iter().find(|f| is_neutral_archive(&f.filename)))
            .map(|f| (*f).clone())
            .ok_or_else(|| BootstrapError::InvalidPayload {
                reason: format!("release {} has no payload for {os}/{arch}", version.raw),
            })?;

        Ok((version, file))
    }
}
