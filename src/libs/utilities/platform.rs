// Platform detection and release-file matching.
// The release index may publish several payload files per version; these helpers
// pick the one built for the running OS and CPU, falling back to platform-neutral files.

use crate::log_debug;
use colored::Colorize;

/// Platform-neutral payload suffixes, tried when no platform-specific file matches.
pub const NEUTRAL_ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".zip", ".tar", ".tar.xz", ".tar.bz2"];

/// Checks if a release file name is likely built for the given OS and architecture.
/// Matching is fuzzy and alias based ("darwin" == "macos", "aarch64" == "arm64").
///
/// # Arguments
/// * `filename`: The release file name (e.g., "pkm-0.4.0-linux-x86_64.tar.gz").
/// * `os`: Normalized OS (e.g., "linux").
/// * `arch`: Normalized architecture (e.g., "x86_64").
///
/// # Returns
/// * `bool`: `true` when both the OS and the architecture are mentioned and the file
///   is not a checksum or signature.
pub fn asset_matches_platform(filename: &str, os: &str, arch: &str) -> bool {
    let name = filename.to_lowercase();

    let os_matches = os_aliases(os).iter().any(|alias| name.contains(alias));
    if !os_matches {
        return false;
    }

    let arch_matches = arch_aliases(arch).iter().any(|alias| name.contains(alias));

    // Apple Silicon runs x86_64 builds through Rosetta 2.
    let rosetta_fallback = os == "macos"
        && arch == "arm64"
        && name.contains("x86_64")
        && !(name.contains("arm64") || name.contains("aarch64"));

    if !(arch_matches || rosetta_fallback) {
        return false;
    }

    if is_auxiliary_file(&name) {
        return false;
    }

    log_debug!(
        "[Platform] '{}' matches {} / {}",
        filename.dimmed(),
        os.cyan(),
        arch.magenta()
    );
    true
}

/// Checks if a release file is a platform-neutral payload archive
/// (no OS marker in its name, a supported archive suffix, not a checksum).
pub fn is_neutral_archive(filename: &str) -> bool {
    let name = filename.to_lowercase();
    let mentions_os = ["macos", "darwin", "linux", "windows", "win32", "win64"]
        .iter()
        .any(|os| name.contains(os));
    !mentions_os
        && !is_auxiliary_file(&name)
        && NEUTRAL_ARCHIVE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

// Checksums, signatures and source bundles are never payloads.
fn is_auxiliary_file(name_lower: &str) -> bool {
    name_lower.contains("sha256")
        || name_lower.contains("checksum")
        || name_lower.ends_with(".sig")
        || name_lower.ends_with(".asc")
        || name_lower.contains("-src")
        || name_lower.contains("source")
}

fn arch_aliases(arch: &str) -> Vec<&'static str> {
    match arch {
        "arm64" => vec!["arm64", "aarch64"],
        "x86_64" => vec!["x86_64", "amd64", "x64"],
        "x86" => vec!["i686", "i386", "x86_32"],
        _ => vec![],
    }
}

fn os_aliases(os: &str) -> Vec<&'static str> {
    match os {
        "macos" => vec!["macos", "darwin", "apple-darwin", "macosx"],
        "linux" => vec!["linux"],
        "windows" => vec!["windows", "win32", "win64"],
        _ => vec![],
    }
}

/// Detects the current operating system as a normalized string.
pub fn detect_os() -> String {
    normalize_os(std::env::consts::OS)
}

/// Detects the current CPU architecture as a normalized string.
pub fn detect_architecture() -> String {
    normalize_arch(std::env::consts::ARCH)
}

/// Maps OS spellings ("Darwin", "win32", ...) onto "macos" / "linux" / "windows".
/// Unknown values are passed through lowercased.
pub fn normalize_os(os: &str) -> String {
    match os.to_lowercase().as_str() {
        "macos" | "darwin" | "apple-darwin" => "macos".to_string(),
        "linux" => "linux".to_string(),
        "windows" | "win32" | "win64" => "windows".to_string(),
        other => other.to_string(),
    }
}

/// Maps architecture spellings onto "arm64" / "x86_64" / "x86".
/// Unknown values are passed through lowercased.
pub fn normalize_arch(arch: &str) -> String {
    match arch.to_lowercase().as_str() {
        "aarch64" | "arm64" => "arm64".to_string(),
        "amd64" | "x86_64" => "x86_64".to_string(),
        "x86" | "i686" | "i386" => "x86".to_string(),
        other => other.to_string(),
    }
}
