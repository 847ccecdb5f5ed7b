//! Release index access for the script entry path.
//!
//! Fetches the JSON release index and downloads payload files from it. Both
//! HTTP(S) and `file://` URLs are accepted; the latter serves offline mirrors.

use crate::error::{BootstrapError, Result};
use crate::libs::utilities::file_operations::sha256_file;
use crate::schemas::release_index::{ReleaseFile, ReleaseIndex};
use crate::{log_debug, log_info};
use colored::Colorize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn agent(timeout_secs: u64) -> ureq::Agent {
    let timeout = Duration::from_secs(timeout_secs.max(1));
    ureq::AgentBuilder::new()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .user_agent(concat!("pkm-bootstrap/", env!("CARGO_PKG_VERSION")))
        .build()
}

fn local_path(url: &str) -> Option<PathBuf> {
    url.strip_prefix("file://").map(PathBuf::from)
}

fn fetch_failed(url: &str, reason: impl ToString) -> BootstrapError {
    BootstrapError::FetchFailed {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Downloads and parses the release index at `url`.
///
/// # Arguments
/// * `url`: Index location (`https://...` or `file:///...`).
/// * `timeout_secs`: Connect and read timeout.
pub fn fetch_index(url: &str, timeout_secs: u64) -> Result<ReleaseIndex> {
    log_info!("[Index] Fetching release index from {}", url.blue());

    let malformed = |e: &dyn std::fmt::Display| fetch_failed(url, format!("malformed release index: {e}"));
    let index: ReleaseIndex = match local_path(url) {
        Some(path) => {
            let body = fs::read_to_string(&path).map_err(|e| fetch_failed(url, e))?;
            serde_json::from_str(&body).map_err(|e| malformed(&e))?
        }
        None => agent(timeout_secs)
            .get(url)
            .call()
            .map_err(|e| fetch_failed(url, e))?
            .into_json()
            .map_err(|e| malformed(&e))?,
    };
    log_debug!("[Index] Index lists {} release(s)", index.releases.len());
    Ok(index)
}

/// Downloads `file` into `dest_dir` and checks its published sha256 digest.
///
/// # Returns
/// Path of the downloaded file and its sha256 digest.
///
/// # Errors
/// `FetchFailed` on network errors and timeouts, `ChecksumMismatch` when the
/// index publishes a digest the download does not match.
pub fn download_release_file(file: &ReleaseFile, dest_dir: &Path, timeout_secs: u64) -> Result<(PathBuf, String)> {
    // Index file names are untrusted; keep only the last component.
    let name = Path::new(&file.filename)
        .file_name()
        .ok_or_else(|| BootstrapError::InvalidPayload {
            reason: format!("release file name {:?} is not a file name", file.filename),
        })?;
    let dest = dest_dir.join(name);
    log_info!("[Index] Downloading {}", file.filename.cyan());

    match local_path(&file.url) {
        Some(src) => {
            fs::copy(&src, &dest).map_err(|e| fetch_failed(&file.url, e))?;
        }
        None => {
            let response = agent(timeout_secs)
                .get(&file.url)
                .call()
                .map_err(|e| fetch_failed(&file.url, e))?;
            let mut out = File::create(&dest)
                .map_err(|e| BootstrapError::io(format!("failed to create {}", dest.display()), e))?;
            io::copy(&mut response.into_reader(), &mut out).map_err(|e| fetch_failed(&file.url, e))?;
        }
    }

    let actual = sha256_file(&dest)
        .map_err(|e| BootstrapError::io(format!("failed to hash {}", dest.display()), e))?;
    verify_checksum(&file.filename, file.sha256(), &actual)?;
    log_debug!(
        "[Index] {} saved to {} (sha256 {})",
        file.filename,
        dest.display().to_string().green(),
        actual
    );
    Ok((dest, actual))
}

/// Compares a computed digest against the published one, when there is one.
pub fn verify_checksum(file_name: &str, expected: Option<&str>, actual: &str) -> Result<()> {
    match expected {
        Some(expected) if !expected.eq_ignore_ascii_case(actual) => Err(BootstrapError::ChecksumMismatch {
            file: file_name.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }),
        _ => Ok(()),
    }
}
