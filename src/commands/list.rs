// `pkm-bootstrap list`: versions available in the release index.

use crate::commands::load_bootstrap_config;
use crate::libs::package_index::fetch_index;
use crate::libs::paths::resolve_candidate_roots;
use crate::libs::uninstaller::find_installed;
use crate::libs::utilities::platform::{detect_architecture, detect_os, asset_matches_platform};
use crate::libs::utilities::versions::parse_lenient;
use crate::{log_debug, log_warn};
use prettytable::{format, row, Table};

/// Main entry point for the `list` command.
///
/// # Arguments
/// * `config_path`: Optional custom path to `config.yaml`.
/// * `index_url`: Release index overriding the configured one.
pub fn run(config_path: Option<&str>, index_url: Option<&str>) -> anyhow::Result<()> {
    log_debug!("Entered list::run() function.");
    let config = load_bootstrap_config(config_path)?;
    let url = index_url.unwrap_or(&config.index_url);
    let index = fetch_index(url, config.network.timeout_secs)?;

    let versions = index.versions();
    if versions.is_empty() {
        log_warn!("[Index] {} lists no installable versions", url);
        return Ok(());
    }

    let installed = find_installed(&config, &resolve_candidate_roots(&config, None))
        .and_then(|(_, marker)| parse_lenient(&marker.version));
    let latest = index.latest();
    let (os, arch) = (detect_os(), detect_architecture());

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row![b -> "Version", b -> "Files", b -> "Notes"]);
    for version in versions.iter().rev() {
        let files = &index.releases[&version.raw];
        let mut notes = Vec::new();
        if latest.as_ref().is_some_and(|l| l.raw == version.raw) {
            notes.push("latest");
        }
        if installed.as_ref() == Some(&version.parsed) {
            notes.push("installed");
        }
        if !version.parsed.pre.is_empty() {
            notes.push("pre-release");
        }
        if files.iter().any(|f| asset_matches_platform(&f.filename, &os, &arch)) {
            notes.push("native build");
        }
        table.add_row(row![version.raw, files.iter().filter(|f| !f.yanked).count(), notes.join(", ")]);
    }
    table.printstd();
    Ok(())
}
