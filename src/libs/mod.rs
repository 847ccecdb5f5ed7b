// Core of the bootstrap installer.
// Stage modules run in the order an install run visits them.

// Host facts behind a trait so detection can run against fixtures.
pub mod host_probe;
// Configuration file location and candidate roots.
pub mod paths;
// Reads config.yaml.
pub mod config_loading;
// DETECTING
pub mod environment_detection;
// TARGET_RESOLVED
pub mod target_resolver;
// Exclusive lock held for MATERIALIZING and VERIFYING.
pub mod install_lock;
// Release index lookups and downloads for the script entry path.
pub mod package_index;
// Archive or directory payloads, from either entry path.
pub mod payload_source;
// Writes the container's launcher.
pub mod launcher;
// MATERIALIZING
pub mod materializer;
// VERIFYING
pub mod verifier;
// Runs the stages in order.
pub mod bootstrap_run;
// Removes an installed container.
pub mod uninstaller;
// Helpers shared across stages.
pub mod utilities;
