// This file contains the logic for `pkm-bootstrap install`.
// It turns command-line arguments into an install request for one of the two
// entry paths and hands it to the bootstrap run.

use crate::cli::cmd_enums::InstallArgs;
use crate::commands::load_bootstrap_config;
use crate::libs::bootstrap_run::{run_install, InstallRequest, Outcome, PayloadRequest, RunReport};
use crate::libs::host_probe::SystemProbe;
use crate::libs::paths::resolve_candidate_roots;
use crate::libs::payload_source::{Payload, PayloadSource};
use crate::libs::utilities::path_helpers::expand_path;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::env;

/// Main entry point for the `install` command.
///
/// # Arguments
/// * `config_path`: Optional custom path to `config.yaml`.
/// * `args`: Parsed `install` arguments.
pub fn run(config_path: Option<&str>, args: InstallArgs) -> anyhow::Result<()> {
    log_debug!("Entered install::run() function.");
    let config = load_bootstrap_config(config_path)?;
    let candidates = resolve_candidate_roots(&config, args.root.as_deref());

    let payload = if let Some(archive) = &args.from_archive {
        log_info!("[Install] Delegated install from archive via {}", args.manager.cyan());
        PayloadRequest::Local(Payload::delegated(
            PayloadSource::Archive(expand_path(archive)),
            &args.manager,
        )?)
    } else if let Some(dir) = &args.from_dir {
        log_info!("[Install] Delegated install from directory via {}", args.manager.cyan());
        PayloadRequest::Local(Payload::delegated(
            PayloadSource::Directory(expand_path(dir)),
            &args.manager,
        )?)
    } else {
        PayloadRequest::Index {
            url: args.index_url.clone().unwrap_or_else(|| config.index_url.clone()),
            version: args.version.clone(),
        }
    };

    let request = InstallRequest {
        payload,
        force: args.force,
    };
    let report = run_install(&config, &candidates, &SystemProbe, &request)?;
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &RunReport) {
    match &report.outcome {
        Outcome::Installed { version } => {
            log_info!("[Install] Installed pkm {}", version.bright_green());
        }
        Outcome::Upgraded { from, to } => {
            log_info!(
                "[Install] Upgraded pkm {} -> {}",
                from.yellow(),
                to.bright_green()
            );
        }
        Outcome::AlreadyInstalled { version } => {
            log_info!("[Install] pkm {} is already installed. Nothing to do.", version.green());
        }
    }
    log_info!(
        "[Install] Container: {}",
        report.target.root.display().to_string().cyan()
    );
    log_info!(
        "[Install] Launcher:  {}",
        report.marker.launcher.display().to_string().cyan()
    );

    let bin_dir = report.target.bin_dir();
    let on_path = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|p| p == bin_dir))
        .unwrap_or(false);
    if !on_path {
        // The launcher is never linked into a shared bin directory.
        log_info!(
            "[Install] Add it to your PATH to use `{}`:\n    export PATH=\"{}:$PATH\"",
            report.target.command_name.bold(),
            bin_dir.display()
        );
    }
}
