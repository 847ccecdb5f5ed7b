//! Read-only snapshot of the host, captured once per install run by
//! `libs::environment_detection::detect_environment`.

use crate::libs::utilities::versions::satisfies_minimum;
use crate::schemas::container_marker::ContainerMarker;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The interpreter the payload will run on, as found on the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeInfo {
    pub command: String,
    pub path: PathBuf,
    pub version: String,
}

/// What currently occupies the container slot of a candidate root.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContainerSlot {
    /// Nothing at `<candidate>/<package_name>` yet.
    Empty,
    /// A pkm container with a valid marker.
    Installed,
    /// Something that is not a pkm container; never touched.
    Foreign { reason: String },
}

/// A directory that could hold the container, and whether it can be written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRoot {
    pub path: PathBuf,
    pub writable: bool,
    pub container: ContainerSlot,
}

/// A path owned by something else on the host: another package manager's
/// prefix, a virtual environment, or a directory on PATH.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagedPath {
    pub manager: String,
    pub path: PathBuf,
}

/// A pkm container found under one of the candidate roots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorInstall {
    pub candidate: PathBuf,
    pub marker: ContainerMarker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostEnvironment {
    pub os: String,
    pub arch: String,
    /// Configured runtime command, reported even when it was not found.
    pub runtime_command: String,
    pub runtime: Option<RuntimeInfo>,
    pub min_runtime: String,
    pub runtime_required: bool,
    /// Container directory name under a candidate root.
    pub package_name: String,
    pub candidate_roots: Vec<CandidateRoot>,
    pub managed_paths: Vec<ManagedPath>,
    /// Directories searched for commands, in PATH order.
    pub search_path: Vec<PathBuf>,
    /// Launcher names in the order they may be used.
    pub command_candidates: Vec<String>,
    /// Launcher names already provided by an executable on PATH.
    pub occupied_commands: BTreeMap<String, Vec<PathBuf>>,
    pub prior_install: Option<PriorInstall>,
}

impl HostEnvironment {
    /// `true` when the runtime constraint holds (or no runtime is required).
    pub fn runtime_satisfied(&self) -> bool {
        if !self.runtime_required {
            return true;
        }
        self.runtime
            .as_ref()
            .is_some_and(|rt| satisfies_minimum(&rt.version, &self.min_runtime))
    }

    /// Human readable description of what was found, for error messages.
    pub fn runtime_description(&self) -> String {
        match &self.runtime {
            Some(rt) => rt.version.clone(),
            None => "nothing (not found on PATH)".to_string(),
        }
    }
}
