// TARGET_RESOLVED stage: picks the container location and launcher name.
// Pure function of the `HostEnvironment`; performs no I/O.

use crate::error::{BootstrapError, Result};
use crate::libs::utilities::path_helpers::paths_overlap;
use crate::schemas::host_environment::{CandidateRoot, ContainerSlot, HostEnvironment, ManagedPath};
use crate::schemas::install_target::InstallTarget;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;

/// Chooses the isolated `InstallTarget` for this run.
///
/// The same environment always yields the same target. A prior install wins
/// (upgrade in place, same command name). Otherwise the first writable candidate
/// whose container is disjoint from every managed path is taken, together with
/// the first launcher name no foreign executable occupies.
///
/// # Errors
/// * `UnsupportedRuntime` when the environment does not satisfy the runtime constraint.
/// * `NoWritableLocation` when no candidate qualifies.
/// * `ConflictDetected` when every launcher name is taken, or when the existing
///   install cannot be upgraded in place.
pub fn resolve_install_target(env: &HostEnvironment) -> Result<InstallTarget> {
    // Environments can be built by hand, so the runtime check is repeated here.
    if !env.runtime_satisfied() {
        return Err(BootstrapError::UnsupportedRuntime {
            command: env.runtime_command.clone(),
            found: env.runtime_description(),
            required: env.min_runtime.clone(),
        });
    }

    if let Some(prior) = &env.prior_install {
        let target = InstallTarget::new(
            &prior.candidate,
            &env.package_name,
            &prior.marker.command_name,
            Some(prior.marker.clone()),
        );
        let candidate = env.candidate_roots.iter().find(|c| c.path == prior.candidate);
        if candidate.is_some_and(|c| c.writable) {
            if let Some(managed) = first_overlap(env, &target) {
                return Err(BootstrapError::ConflictDetected {
                    reason: format!(
                        "existing container {} overlaps {} path {}",
                        target.root.display(),
                        managed.manager,
                        managed.path.display()
                    ),
                });
            }
            ensure_launcher_name_free(env, &target.command_name)?;
            log_info!(
                "[Resolve] Upgrading existing container at {}",
                target.root.display().to_string().cyan()
            );
            return Ok(target);
        }
        // A second container elsewhere would claim the same launcher name.
        log_warn!(
            "[Resolve] Existing container at {} is not writable",
            target.root.display().to_string().yellow()
        );
        return Err(BootstrapError::ConflictDetected {
            reason: format!(
                "pkm {} is already installed at {}, which is not writable; make it writable or uninstall it first",
                prior.marker.version,
                target.root.display()
            ),
        });
    }

    let candidate = env
        .candidate_roots
        .iter()
        .find(|c| candidate_qualifies(env, c))
        .ok_or_else(|| BootstrapError::NoWritableLocation {
            candidates: env.candidate_roots.iter().map(|c| c.path.clone()).collect(),
        })?;

    let command_name = env
        .command_candidates
        .iter()
        .find(|name| !env.occupied_commands.contains_key(*name))
        .ok_or_else(|| BootstrapError::ConflictDetected {
            reason: format!(
                "every launcher name is already provided by another tool: {}",
                describe_occupied(env)
            ),
        })?;

    let target = InstallTarget::new(&candidate.path, &env.package_name, command_name, None);
    log_info!(
        "[Resolve] Installing into {} as `{}`",
        target.root.display().to_string().cyan(),
        target.command_name.green()
    );
    Ok(target)
}

fn candidate_qualifies(env: &HostEnvironment, candidate: &CandidateRoot) -> bool {
    if !candidate.writable {
        log_debug!("[Resolve] Skipping {}: not writable", candidate.path.display());
        return false;
    }
    if let ContainerSlot::Foreign { reason } = &candidate.container {
        log_debug!("[Resolve] Skipping {}: container slot {}", candidate.path.display(), reason);
        return false;
    }
    let root = candidate.path.join(&env.package_name);
    if let Some(managed) = env.managed_paths.iter().find(|m| paths_overlap(&root, &m.path)) {
        log_debug!(
            "[Resolve] Skipping {}: overlaps {} path {}",
            candidate.path.display(),
            managed.manager,
            managed.path.display()
        );
        return false;
    }
    true
}

fn first_overlap<'a>(env: &'a HostEnvironment, target: &InstallTarget) -> Option<&'a ManagedPath> {
    env.managed_paths.iter().find(|m| paths_overlap(&target.root, &m.path))
}

fn ensure_launcher_name_free(env: &HostEnvironment, name: &str) -> Result<()> {
    match env.occupied_commands.get(name) {
        Some(paths) => Err(BootstrapError::ConflictDetected {
            reason: format!(
                "launcher name `{name}` of the existing install is now provided by {}",
                paths
                    .first()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
        }),
        None => Ok(()),
    }
}

fn describe_occupied(env: &HostEnvironment) -> String {
    env.occupied_commands
        .iter()
        .filter_map(|(name, paths)| paths.first().map(|p| format!("{name} ({})", p.display())))
        .collect::<Vec<_>>()
        .join(", ")
}
