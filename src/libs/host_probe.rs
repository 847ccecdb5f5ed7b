//! Access to host facts used by environment detection.
//!
//! [`HostProbe`] is the seam between detection and the machine: [`SystemProbe`]
//! reads the real process environment, [`StaticProbe`] answers from a fixed
//! snapshot so detection can be exercised without touching the host.

use crate::libs::utilities::file_operations::is_writable_location;
use crate::libs::utilities::platform::{detect_architecture, detect_os};
use crate::libs::utilities::versions::extract_version_number;
use crate::log_debug;
use colored::Colorize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub trait HostProbe {
    /// Normalized OS name ("linux", "macos", "windows").
    fn os(&self) -> String;
    /// Normalized CPU architecture ("x86_64", "arm64").
    fn arch(&self) -> String;
    /// Directories on PATH, in order.
    fn search_path(&self) -> Vec<PathBuf>;
    /// An environment variable, `None` when unset or empty.
    fn var(&self, name: &str) -> Option<String>;
    fn home_dir(&self) -> Option<PathBuf>;
    /// Version reported by running `<executable> --version`.
    fn runtime_version(&self, executable: &Path) -> Option<String>;
    /// Whether a directory could be created and written at `path`, decided without writing.
    fn is_writable(&self, path: &Path) -> bool;
}

/// Probe backed by the running process and the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn os(&self) -> String {
        detect_os()
    }

    fn arch(&self) -> String {
        detect_architecture()
    }

    fn search_path(&self) -> Vec<PathBuf> {
        env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).collect())
            .unwrap_or_default()
    }

    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.is_empty())
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn runtime_version(&self, executable: &Path) -> Option<String> {
        let output = Command::new(executable)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            log_debug!(
                "[Probe] {} --version exited with {}",
                executable.display().to_string().yellow(),
                output.status
            );
            return None;
        }
        // Older interpreters print their banner on stderr.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let banner = if stdout.trim().is_empty() { stderr } else { stdout };
        let version = extract_version_number(banner.trim())?.to_string();
        log_debug!(
            "[Probe] {} reports version {}",
            executable.display().to_string().cyan(),
            version.green()
        );
        Some(version)
    }

    fn is_writable(&self, path: &Path) -> bool {
        is_writable_location(path)
    }
}

/// Probe answering from fixed values. Executables and writability still come
/// from the real filesystem (so fixtures can be laid out in a temp directory),
/// except for paths listed in `read_only`.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub os: String,
    pub arch: String,
    pub search_path: Vec<PathBuf>,
    pub vars: HashMap<String, String>,
    pub home: Option<PathBuf>,
    pub runtime_version: Option<String>,
    pub read_only: Vec<PathBuf>,
}

impl StaticProbe {
    /// A linux/x86_64 host with an empty PATH and no runtime.
    pub fn new() -> Self {
        StaticProbe {
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
            ..StaticProbe::default()
        }
    }
}

impl HostProbe for StaticProbe {
    fn os(&self) -> String {
        self.os.clone()
    }

    fn arch(&self) -> String {
        self.arch.clone()
    }

    fn search_path(&self) -> Vec<PathBuf> {
        self.search_path.clone()
    }

    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).filter(|v| !v.is_empty()).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }

    fn runtime_version(&self, _executable: &Path) -> Option<String> {
        self.runtime_version.clone()
    }

    fn is_writable(&self, path: &Path) -> bool {
        if self.read_only.iter().any(|ro| path.starts_with(ro)) {
            return false;
        }
        is_writable_location(path)
    }
}
