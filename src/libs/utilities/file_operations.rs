// Filesystem helpers shared by detection, materialization and verification.

use crate::log_debug;
use colored::Colorize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Recursively copies the contents of `src` into `dest` (created if missing).
/// Symlinks are copied as the files they point to; the container must not depend
/// on anything outside itself.
pub fn copy_dir_all(src: &Path, dest: &Path) -> io::Result<()> {
    log_debug!(
        "[Files] Copying {} into {}",
        src.display().to_string().blue(),
        dest.display().to_string().cyan()
    );
    fs::create_dir_all(dest)?;
    for entry in WalkDir::new(src).follow_links(true).min_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Makes a file executable (`chmod 755`). A no-op on non-Unix platforms, where
/// executability follows the file extension.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// `true` when `path` is a regular file that the OS would execute.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Executable file names a command can have on this platform.
pub fn executable_names(command: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![
            format!("{command}.exe"),
            format!("{command}.cmd"),
            format!("{command}.bat"),
            command.to_string(),
        ]
    } else {
        vec![command.to_string()]
    }
}

/// Finds every executable named `command` in `dirs`, in order.
pub fn find_executables(command: &str, dirs: &[PathBuf]) -> Vec<PathBuf> {
    let names = executable_names(command);
    dirs.iter()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .filter(|candidate| is_executable(candidate))
        .collect()
}

/// Decides, without writing anything, whether a directory could be created and
/// written at `path`: walks up to the nearest existing ancestor and checks that it
/// is a directory the current user may write to.
pub fn is_writable_location(path: &Path) -> bool {
    let mut probe = Some(path);
    while let Some(candidate) = probe {
        if let Ok(meta) = fs::metadata(candidate) {
            return meta.is_dir() && dir_permits_write(candidate, &meta);
        }
        probe = candidate.parent();
    }
    false
}

#[cfg(unix)]
fn dir_permits_write(dir: &Path, meta: &fs::Metadata) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    if meta.permissions().readonly() {
        return false;
    }
    // Ask the kernel with the process's real credentials instead of decoding mode bits.
    let Ok(c_path) = CString::new(dir.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK | libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn dir_permits_write(_dir: &Path, meta: &fs::Metadata) -> bool {
    !meta.permissions().readonly()
}

/// SHA-256 of a file, hex encoded.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

/// Removes a directory tree if it exists.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
