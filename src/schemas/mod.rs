// Data shapes the installer reads, writes, or passes between stages.
// On-disk formats: config.yaml (bootstrap_config), .pkm-container.json
// (container_marker), pkm-payload.toml (payload_manifest), and the JSON release
// index (release_index). In-memory only: host_environment and install_target.

pub mod bootstrap_config;
pub mod container_marker;
pub mod host_environment;
pub mod install_target;
pub mod payload_manifest;
pub mod release_index;
