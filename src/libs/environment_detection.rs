// DETECTING stage: builds the read-only `HostEnvironment` snapshot for one run.
// Nothing in this module writes to the filesystem.

use crate::error::{BootstrapError, Result};
use crate::libs::host_probe::HostProbe;
use crate::libs::utilities::file_operations::find_executables;
use crate::libs::utilities::path_helpers::{normalize_lexically, resolve_existing_prefix};
use crate::schemas::bootstrap_config::BootstrapConfig;
use crate::schemas::container_marker::ContainerMarker;
use crate::schemas::host_environment::{
    CandidateRoot, ContainerSlot, HostEnvironment, ManagedPath, PriorInstall, RuntimeInfo,
};
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A package manager (or environment tool) whose files the container must never share.
struct ManagerDef {
    name: &'static str,
    /// Variable that points at the manager's prefix when it is active or relocated.
    env_var: Option<&'static str>,
    /// Locations relative to the home directory.
    home_paths: &'static [&'static str],
    /// Absolute locations.
    system_paths: &'static [&'static str],
}

const MANAGER_DEFS: &[ManagerDef] = &[
    ManagerDef {
        name: "virtualenv",
        env_var: Some("VIRTUAL_ENV"),
        home_paths: &[],
        system_paths: &[],
    },
    ManagerDef {
        name: "conda",
        env_var: Some("CONDA_PREFIX"),
        home_paths: &[".conda", "miniconda3", "anaconda3", "miniforge3"],
        system_paths: &["/opt/conda"],
    },
    ManagerDef {
        name: "pip-user",
        env_var: Some("PYTHONUSERBASE"),
        home_paths: &[".local/lib", "Library/Python"],
        system_paths: &[],
    },
    ManagerDef {
        name: "pipx",
        env_var: Some("PIPX_HOME"),
        home_paths: &[".local/pipx", ".local/share/pipx"],
        system_paths: &[],
    },
    ManagerDef {
        name: "pyenv",
        env_var: Some("PYENV_ROOT"),
        home_paths: &[".pyenv"],
        system_paths: &[],
    },
    ManagerDef {
        name: "uv",
        env_var: Some("UV_TOOL_DIR"),
        home_paths: &[".local/share/uv"],
        system_paths: &[],
    },
    ManagerDef {
        name: "poetry",
        env_var: Some("POETRY_HOME"),
        home_paths: &[".local/share/pypoetry"],
        system_paths: &[],
    },
    ManagerDef {
        name: "cargo",
        env_var: Some("CARGO_HOME"),
        home_paths: &[".cargo"],
        system_paths: &[],
    },
    ManagerDef {
        name: "homebrew",
        env_var: Some("HOMEBREW_PREFIX"),
        home_paths: &[],
        system_paths: &["/opt/homebrew", "/home/linuxbrew/.linuxbrew"],
    },
    ManagerDef {
        name: "nvm",
        env_var: Some("NVM_DIR"),
        home_paths: &[".nvm"],
        system_paths: &[],
    },
    ManagerDef {
        name: "mise",
        env_var: Some("MISE_DATA_DIR"),
        home_paths: &[".local/share/mise"],
        system_paths: &[],
    },
    ManagerDef {
        name: "system",
        env_var: None,
        home_paths: &[],
        system_paths: &["/usr", "/usr/local", "/bin", "/sbin", "/Library/Frameworks/Python.framework"],
    },
];

/// Captures the `HostEnvironment` for this run.
///
/// Fails with `UnsupportedRuntime` when a runtime is required and the configured
/// command is missing from PATH or older than `runtime.min_version`.
///
/// # Arguments
/// * `config`: The loaded bootstrap configuration.
/// * `candidates`: Candidate parent directories for the container, in preference order.
/// * `probe`: Source of host facts.
pub fn detect_environment(
    config: &BootstrapConfig,
    candidates: &[PathBuf],
    probe: &dyn HostProbe,
) -> Result<HostEnvironment> {
    log_info!("[Detect] Inspecting host environment...");

    let os = probe.os();
    let arch = probe.arch();
    let search_path: Vec<PathBuf> = probe
        .search_path()
        .into_iter()
        .filter(|p| p.is_absolute())
        .collect();
    log_debug!("[Detect] Platform: {} / {}", os.cyan(), arch.cyan());

    let runtime = detect_runtime(config, &search_path, probe);
    let env = HostEnvironment {
        os,
        arch,
        runtime_command: config.runtime.command.clone(),
        runtime,
        min_runtime: config.runtime.min_version.clone(),
        runtime_required: config.runtime.required,
        package_name: config.package_name.clone(),
        candidate_roots: Vec::new(),
        managed_paths: Vec::new(),
        search_path,
        command_candidates: config.command_candidates(),
        occupied_commands: BTreeMap::new(),
        prior_install: None,
    };

    if !env.runtime_satisfied() {
        return Err(BootstrapError::UnsupportedRuntime {
            command: env.runtime_command.clone(),
            found: env.runtime_description(),
            required: env.min_runtime.clone(),
        });
    }

    let containers: Vec<PathBuf> = candidates
        .iter()
        .map(|c| resolve_existing_prefix(&c.join(&config.package_name)))
        .collect();

    let mut candidate_roots = Vec::new();
    let mut prior_install = None;
    for candidate in candidates {
        let container = candidate.join(&config.package_name);
        let (slot, marker) = inspect_container(&container);
        if let (ContainerSlot::Installed, Some(marker), None) = (&slot, marker, &prior_install) {
            log_info!(
                "[Detect] Found pkm {} installed at {}",
                marker.version.green(),
                container.display().to_string().cyan()
            );
            prior_install = Some(PriorInstall {
                candidate: candidate.clone(),
                marker,
            });
        }
        candidate_roots.push(CandidateRoot {
            path: candidate.clone(),
            writable: probe.is_writable(candidate),
            container: slot,
        });
    }

    let managed_paths = collect_managed_paths(probe, &env.search_path, &containers);
    let occupied_commands = collect_occupied_commands(&env.command_candidates, &env.search_path, &containers);

    let env = HostEnvironment {
        candidate_roots,
        managed_paths,
        occupied_commands,
        prior_install,
        ..env
    };
    log_debug!(
        "[Detect] {} candidate root(s), {} managed path(s), {} occupied command name(s)",
        env.candidate_roots.len(),
        env.managed_paths.len(),
        env.occupied_commands.len()
    );
    Ok(env)
}

fn detect_runtime(config: &BootstrapConfig, search_path: &[PathBuf], probe: &dyn HostProbe) -> Option<RuntimeInfo> {
    let command = &config.runtime.command;
    let path = match find_executables(command, search_path).into_iter().next() {
        Some(path) => path,
        None => {
            if config.runtime.required {
                log_warn!("[Detect] Runtime `{}` was not found on PATH", command.yellow());
            }
            return None;
        }
    };
    let version = probe.runtime_version(&path)?;
    log_info!(
        "[Detect] Runtime: {} {} ({})",
        command.cyan(),
        version.green(),
        path.display()
    );
    Some(RuntimeInfo {
        command: command.clone(),
        path,
        version,
    })
}

// Reads the container slot. A directory without a valid marker is foreign.
fn inspect_container(container: &Path) -> (ContainerSlot, Option<ContainerMarker>) {
    if !container.exists() {
        return (ContainerSlot::Empty, None);
    }
    match ContainerMarker::load(container) {
        Ok(Some(marker)) => (ContainerSlot::Installed, Some(marker)),
        Ok(None) => (
            ContainerSlot::Foreign {
                reason: "exists without a pkm container marker".to_string(),
            },
            None,
        ),
        Err(e) => (ContainerSlot::Foreign { reason: e.to_string() }, None),
    }
}

/// Paths owned by other package managers plus every PATH directory.
/// PATH entries inside one of our own containers (a user who added
/// `<container>/bin` to PATH) are ours and are left out.
fn collect_managed_paths(probe: &dyn HostProbe, search_path: &[PathBuf], containers: &[PathBuf]) -> Vec<ManagedPath> {
    let home = probe.home_dir();
    let mut managed: Vec<ManagedPath> = Vec::new();
    let mut push = |manager: &str, path: PathBuf| {
        let path = normalize_lexically(&path);
        if !managed.iter().any(|m| m.path == path) {
            managed.push(ManagedPath {
                manager: manager.to_string(),
                path,
            });
        }
    };

    for def in MANAGER_DEFS {
        if let Some(value) = def.env_var.and_then(|var| probe.var(var)) {
            push(def.name, PathBuf::from(value));
        }
        if let Some(home) = &home {
            for rel in def.home_paths {
                let candidate = home.join(rel);
                if candidate.exists() {
                    push(def.name, candidate);
                }
            }
        }
        for abs in def.system_paths {
            let candidate = PathBuf::from(abs);
            if candidate.exists() {
                push(def.name, candidate);
            }
        }
    }

    for dir in search_path {
        let normalized = resolve_existing_prefix(dir);
        if containers.iter().any(|c| normalized.starts_with(c)) {
            continue;
        }
        push("PATH", dir.clone());
    }
    managed
}

/// Launcher names already taken by executables on PATH that are not ours.
fn collect_occupied_commands(
    names: &[String],
    search_path: &[PathBuf],
    containers: &[PathBuf],
) -> BTreeMap<String, Vec<PathBuf>> {
    let mut occupied = BTreeMap::new();
    for name in names {
        let foreign: Vec<PathBuf> = find_executables(name, search_path)
            .into_iter()
            .filter(|exe| {
                let exe = resolve_existing_prefix(exe);
                !containers.iter().any(|c| exe.starts_with(c))
            })
            .collect();
        if !foreign.is_empty() {
            log_debug!(
                "[Detect] Command name `{}` is taken by {}",
                name.yellow(),
                foreign[0].display()
            );
            occupied.insert(name.clone(), foreign);
        }
    }
    occupied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::host_probe::StaticProbe;
    use crate::libs::utilities::file_operations::make_executable;
    use std::fs;
    use tempfile::tempdir;

    fn runtime_dir(root: &Path) -> PathBuf {
        let bin = root.join("runtime-bin");
        fs::create_dir_all(&bin).unwrap();
        let exe = bin.join(if cfg!(windows) { "python3.exe" } else { "python3" });
        fs::write(&exe, "#!/bin/sh\n").unwrap();
        make_executable(&exe).unwrap();
        bin
    }

    fn probe_with_runtime(root: &Path, version: &str) -> StaticProbe {
        let mut probe = StaticProbe::new();
        probe.search_path = vec![runtime_dir(root)];
        probe.runtime_version = Some(version.to_string());
        probe
    }

    #[test]
    fn old_runtime_is_rejected() {
        let tmp = tempdir().unwrap();
        let probe = probe_with_runtime(tmp.path(), "3.6.9");
        let err = detect_environment(&BootstrapConfig::default(), &[tmp.path().join("arena")], &probe)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::UnsupportedRuntime { .. }));
        assert!(!tmp.path().join("arena").exists());
    }

    #[test]
    fn missing_runtime_is_rejected_unless_optional() {
        let tmp = tempdir().unwrap();
        let probe = StaticProbe::new();
        let candidates = [tmp.path().join("arena")];
        assert!(matches!(
            detect_environment(&BootstrapConfig::default(), &candidates, &probe),
            Err(BootstrapError::UnsupportedRuntime { .. })
        ));

        let mut config = BootstrapConfig::default();
        config.runtime.required = false;
        let env = detect_environment(&config, &candidates, &probe).unwrap();
        assert!(env.runtime.is_none());
    }

    #[test]
    fn records_candidates_and_prior_install() {
        let tmp = tempdir().unwrap();
        let probe = probe_with_runtime(tmp.path(), "3.11.4");
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        fs::create_dir_all(first.join("pkm")).unwrap();
        fs::write(first.join("pkm/readme"), "someone else's").unwrap();

        let env = detect_environment(&BootstrapConfig::default(), &[first.clone(), second.clone()], &probe)
            .unwrap();
        assert_eq!(env.candidate_roots.len(), 2);
        assert!(matches!(env.candidate_roots[0].container, ContainerSlot::Foreign { .. }));
        assert_eq!(env.candidate_roots[1].container, ContainerSlot::Empty);
        assert!(env.candidate_roots.iter().all(|c| c.writable));
        assert!(env.prior_install.is_none());
        assert_eq!(env.runtime.as_ref().unwrap().version, "3.11.4");
    }

    #[test]
    fn managed_paths_include_active_environments_and_path() {
        let tmp = tempdir().unwrap();
        let mut probe = probe_with_runtime(tmp.path(), "3.11.4");
        probe.vars.insert("VIRTUAL_ENV".into(), "/work/.venv".into());
        let env = detect_environment(&BootstrapConfig::default(), &[tmp.path().join("arena")], &probe)
            .unwrap();
        assert!(env
            .managed_paths
            .iter()
            .any(|m| m.manager == "virtualenv" && m.path == PathBuf::from("/work/.venv")));
        assert!(env
            .managed_paths
            .iter()
            .any(|m| m.manager == "PATH" && m.path == tmp.path().join("runtime-bin")));
    }

    #[cfg(unix)]
    #[test]
    fn foreign_commands_occupy_their_names_but_ours_do_not() {
        let tmp = tempdir().unwrap();
        let mut probe = probe_with_runtime(tmp.path(), "3.11.4");
        let foreign_bin = tmp.path().join("foreign-bin");
        fs::create_dir_all(&foreign_bin).unwrap();
        fs::write(foreign_bin.join("pkm"), "#!/bin/sh\n").unwrap();
        make_executable(&foreign_bin.join("pkm")).unwrap();

        let arena = tmp.path().join("arena");
        let our_bin = arena.join("pkm/bin");
        fs::create_dir_all(&our_bin).unwrap();
        fs::write(our_bin.join("pkm-cli"), "#!/bin/sh\n").unwrap();
        make_executable(&our_bin.join("pkm-cli")).unwrap();

        probe.search_path.push(foreign_bin.clone());
        probe.search_path.push(our_bin.clone());

        let env = detect_environment(&BootstrapConfig::default(), &[arena], &probe).unwrap();
        assert_eq!(env.occupied_commands.get("pkm"), Some(&vec![foreign_bin.join("pkm")]));
        assert!(!env.occupied_commands.contains_key("pkm-cli"));
        assert!(!env.managed_paths.iter().any(|m| m.path == our_bin));
    }
}
