// `pkm-bootstrap status`: what the installer sees on this host and what is installed.

use crate::commands::load_bootstrap_config;
use crate::libs::environment_detection::detect_environment;
use crate::libs::host_probe::SystemProbe;
use crate::libs::paths::resolve_candidate_roots;
use crate::libs::target_resolver::resolve_install_target;
use crate::libs::uninstaller::find_installed;
use crate::libs::utilities::timestamps::format_timestamp;
use crate::schemas::host_environment::{ContainerSlot, HostEnvironment};
use crate::log_debug;
use prettytable::{format, row, Table};
use serde_json::json;

/// Main entry point for the `status` command.
///
/// # Arguments
/// * `config_path`: Optional custom path to `config.yaml`.
/// * `root`: Restrict the candidate roots to this directory.
/// * `as_json`: Print machine-readable JSON instead of a table.
pub fn run(config_path: Option<&str>, root: Option<&str>, as_json: bool) -> anyhow::Result<()> {
    log_debug!("Entered status::run() function.");
    let mut config = load_bootstrap_config(config_path)?;
    let candidates = resolve_candidate_roots(&config, root);
    let installed = find_installed(&config, &candidates);

    if as_json {
        let value = match &installed {
            Some((candidate, marker)) => json!({
                "installed": true,
                "root": candidate.join(&config.package_name),
                "marker": marker,
            }),
            None => json!({ "installed": false }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    // Report the runtime instead of failing on it.
    let runtime_required = config.runtime.required;
    config.runtime.required = false;
    let mut env = detect_environment(&config, &candidates, &SystemProbe)?;
    env.runtime_required = runtime_required;

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row![b -> "Item", b -> "Value"]);
    table.add_row(row!["Platform", format!("{} / {}", env.os, env.arch)]);
    table.add_row(row!["Runtime", describe_runtime(&env)]);
    for candidate in &env.candidate_roots {
        table.add_row(row![
            "Candidate root",
            format!(
                "{} ({}, {})",
                candidate.path.display(),
                if candidate.writable { "writable" } else { "read-only" },
                describe_slot(&candidate.container)
            )
        ]);
    }
    table.add_row(row!["Managed paths", env.managed_paths.len()]);

    match &installed {
        Some((candidate, marker)) => {
            table.add_row(row!["Installed", format!("pkm {}", marker.version)]);
            table.add_row(row!["Container", candidate.join(&config.package_name).display()]);
            table.add_row(row!["Launcher", marker.launcher.display()]);
            table.add_row(row!["Entry path", marker.entry_path]);
            table.add_row(row!["Installed at", format_timestamp(&marker.installed_at)]);
            table.add_row(row!["Updated at", format_timestamp(&marker.updated_at)]);
        }
        None => {
            let next = match resolve_install_target(&env) {
                Ok(target) => format!("not installed; would install into {}", target.root.display()),
                Err(e) => format!("not installed; {e}"),
            };
            table.add_row(row!["Installed", next]);
        }
    }
    table.printstd();
    Ok(())
}

fn describe_runtime(env: &HostEnvironment) -> String {
    let found = match &env.runtime {
        Some(rt) => format!("{} {} ({})", rt.command, rt.version, rt.path.display()),
        None => format!("{} not found", env.runtime_command),
    };
    let verdict = if env.runtime_satisfied() { "ok" } else { "unsupported" };
    format!("{found}, requires >= {}: {verdict}", env.min_runtime)
}

fn describe_slot(slot: &ContainerSlot) -> String {
    match slot {
        ContainerSlot::Empty => "empty".to_string(),
        ContainerSlot::Installed => "pkm installed".to_string(),
        ContainerSlot::Foreign { reason } => format!("occupied: {reason}"),
    }
}
