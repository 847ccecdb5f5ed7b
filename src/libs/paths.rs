use crate::libs::utilities::path_helpers::{expand_path, get_bootstrap_dir};
use crate::log_debug;
use crate::schemas::bootstrap_config::BootstrapConfig;
use colored::Colorize;
use std::path::PathBuf;

/// Resolves the configuration file path: the user-supplied path (from `--config`
/// or `PKM_BOOTSTRAP_CONFIG`) or `~/.pkm-bootstrap/config.yaml`.
pub fn resolve_config_path(config_path: Option<&str>) -> PathBuf {
    let resolved = match config_path {
        Some(path) => expand_path(path),
        None => get_bootstrap_dir().join("config.yaml"),
    };
    log_debug!("[Paths] Configuration file: {}", resolved.display().to_string().cyan());
    resolved
}

/// Platform default parents for the container, most preferred first:
/// the per-user data directory (e.g. `~/.local/share/pkm-bootstrap`) and the
/// bootstrap's own directory (`~/.pkm-bootstrap/apps`).
pub fn default_candidate_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(data) = dirs::data_local_dir() {
        roots.push(data.join("pkm-bootstrap"));
    }
    roots.push(get_bootstrap_dir().join("apps"));
    roots
}

/// Final list of candidate roots for this run. An explicit root (from `--root` or
/// `PKM_BOOTSTRAP_ROOT`) replaces every other candidate; otherwise configured
/// roots are used, and the platform defaults when none are configured.
pub fn resolve_candidate_roots(config: &BootstrapConfig, root_override: Option<&str>) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> = if let Some(root) = root_override {
        vec![expand_path(root)]
    } else if !config.candidate_roots.is_empty() {
        config.candidate_roots.iter().map(|r| expand_path(r)).collect()
    } else {
        default_candidate_roots()
    };

    for root in &roots {
        log_debug!("[Paths] Candidate root: {}", root.display().to_string().yellow());
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_replaces_everything() {
        let config = BootstrapConfig {
            candidate_roots: vec!["/configured".into()],
            ..BootstrapConfig::default()
        };
        assert_eq!(
            resolve_candidate_roots(&config, Some("/explicit")),
            vec![PathBuf::from("/explicit")]
        );
        assert_eq!(
            resolve_candidate_roots(&config, None),
            vec![PathBuf::from("/configured")]
        );
    }

    #[test]
    fn defaults_are_never_empty() {
        let roots = resolve_candidate_roots(&BootstrapConfig::default(), None);
        assert!(!roots.is_empty());
        assert!(roots.iter().all(|r| r.is_absolute() || r.starts_with(".")));
    }

    #[test]
    fn explicit_config_path_wins() {
        assert_eq!(resolve_config_path(Some("/etc/pkm.yaml")), PathBuf::from("/etc/pkm.yaml"));
        assert!(resolve_config_path(None).ends_with("config.yaml"));
    }
}
