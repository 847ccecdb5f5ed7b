//! # Bootstrap Configuration Schema (`config.yaml`)
//!
//! Optional YAML file read from `~/.pkm-bootstrap/config.yaml` (or `--config` /
//! `PKM_BOOTSTRAP_CONFIG`). Every field has a default, so a missing file or a
//! partial file is fine.
//!
//! ```yaml
//! package_name: pkm
//! index_url: https://pypi.org/pypi/pkm-cli/json
//! command_name: pkm
//! command_fallbacks: [pkm-cli]
//! candidate_roots:
//!   - ~/.local/share/pkm-bootstrap
//! runtime:
//!   command: python3
//!   min_version: "3.8"
//!   required: true
//! network:
//!   timeout_secs: 60
//! verify:
//!   smoke_test: false
//! ```

use serde::{Deserialize, Serialize};

/// Top-level configuration of the bootstrap installer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Name of the container directory created under the chosen candidate root.
    pub package_name: String,
    /// Release index consulted by the script entry path (`install`, `list`).
    pub index_url: String,
    /// Preferred name of the launcher.
    pub command_name: String,
    /// Launcher names tried, in order, when `command_name` is taken by another tool.
    pub command_fallbacks: Vec<String>,
    /// Candidate parent directories for the container, in preference order.
    /// Empty means the platform defaults (see `libs::paths::default_candidate_roots`).
    pub candidate_roots: Vec<String>,
    pub runtime: RuntimeConfig,
    pub network: NetworkConfig,
    pub verify: VerifyConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        BootstrapConfig {
            package_name: "pkm".to_string(),
            index_url: "https://pypi.org/pypi/pkm-cli/json".to_string(),
            command_name: "pkm".to_string(),
            command_fallbacks: vec!["pkm-cli".to_string()],
            candidate_roots: Vec::new(),
            runtime: RuntimeConfig::default(),
            network: NetworkConfig::default(),
            verify: VerifyConfig::default(),
        }
    }
}

impl BootstrapConfig {
    /// Launcher names in the order they are tried.
    pub fn command_candidates(&self) -> Vec<String> {
        let mut names = vec![self.command_name.clone()];
        for fallback in &self.command_fallbacks {
            if !names.contains(fallback) {
                names.push(fallback.clone());
            }
        }
        names
    }
}

/// The interpreter the pkm payload runs on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Command looked up on PATH (e.g. `python3`).
    pub command: String,
    /// Minimum accepted version, compared leniently (`3.8` == `3.8.0`).
    pub min_version: String,
    /// When `false` the runtime is optional (native payloads).
    pub required: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            command: "python3".to_string(),
            min_version: "3.8".to_string(),
            required: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Connect and read timeout for index and payload requests.
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig { timeout_secs: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Run `<launcher> --version` as part of verification.
    pub smoke_test: bool,
    /// How long the smoke test may take before it counts as a failure.
    pub smoke_timeout_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        VerifyConfig {
            smoke_test: false,
            smoke_timeout_secs: 20,
        }
    }
}
