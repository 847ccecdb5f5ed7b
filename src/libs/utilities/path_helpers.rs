use crate::{log_debug, log_warn};
use colored::Colorize;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Expands `~` and `$VARS` in a user supplied path.
/// Falls back to the raw string when a referenced variable is unset, which keeps
/// the mistake visible in later log lines instead of silently dropping it.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log_warn!(
                "[Paths] Could not expand '{}': {}. Using it verbatim.",
                path.yellow(),
                e
            );
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}

/// Returns the bootstrap's own directory, `~/.pkm-bootstrap`, holding its configuration.
/// Falls back to the current directory when no home directory can be determined.
pub fn get_bootstrap_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".pkm-bootstrap"),
        None => {
            let fallback = env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(".pkm-bootstrap");
            log_warn!(
                "[Paths] Could not determine home directory. Falling back to {}",
                fallback.display().to_string().yellow()
            );
            fallback
        }
    }
}

/// Makes `path` absolute (against the current directory) and removes `.` and `..`
/// components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().unwrap_or_else(|_| PathBuf::from("/")).join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves symlinks in the longest existing prefix of `path` and reattaches the
/// components that do not exist yet. Falls back to the lexical form when no
/// ancestor can be resolved.
pub fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    let mut existing = normalized.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(real) = fs::canonicalize(existing) {
            return missing.iter().rev().fold(real, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// `true` when the two paths are equal or one lies inside the other, after
/// symlinks in their existing prefixes are resolved.
/// This is the overlap test behind the isolation invariant: a container root
/// that overlaps any managed path would share files with another package manager.
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    let a = resolve_existing_prefix(a);
    let b = resolve_existing_prefix(b);
    let overlap = a.starts_with(&b) || b.starts_with(&a);
    if overlap {
        log_debug!(
            "[Paths] {} overlaps {}",
            a.display().to_string().yellow(),
            b.display().to_string().yellow()
        );
    }
    overlap
}
