// Register application subcommands.
// Each module corresponds to a specific `pkm-bootstrap` command-line action.

use crate::libs::config_loading::load_config;
use crate::libs::paths::resolve_config_path;
use crate::schemas::bootstrap_config::BootstrapConfig;

// Installs or upgrades pkm (script and delegated entry paths).
pub mod install;
// Lists versions from the release index.
pub mod list;
// Shows the host environment and the installed container.
pub mod status;
// Removes the installed container.
pub mod uninstall;
// Displays the version of pkm-bootstrap.
pub mod version;

/// Resolves and loads the configuration every command starts from.
pub(crate) fn load_bootstrap_config(config_path: Option<&str>) -> crate::error::Result<BootstrapConfig> {
    load_config(&resolve_config_path(config_path))
}
