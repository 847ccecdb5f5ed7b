//! # Payload Manifest (`pkm-payload.toml`)
//!
//! Every pkm payload carries a small TOML manifest at its top level describing
//! what it is and how the launcher should start it:
//!
//! ```toml
//! name = "pkm"
//! version = "0.4.0"
//! entry = "pkm/__main__.py"
//! runtime_args = ["-I"]   # e.g. isolated interpreter mode
//! native = false          # true when `entry` is a native executable
//! ```

use crate::error::{BootstrapError, Result};
use crate::libs::utilities::versions::parse_lenient;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};

pub const MANIFEST_FILE_NAME: &str = "pkm-payload.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadManifest {
    pub name: String,
    pub version: String,
    pub entry: String,
    #[serde(default)]
    pub runtime_args: Vec<String>,
    #[serde(default)]
    pub native: bool,
}

impl PayloadManifest {
    /// Reads and validates the manifest at the top of `payload_dir`.
    pub fn load(payload_dir: &Path) -> Result<PayloadManifest> {
        let path = payload_dir.join(MANIFEST_FILE_NAME);
        let contents = fs::read_to_string(&path).map_err(|e| BootstrapError::InvalidPayload {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        let manifest: PayloadManifest =
            toml::from_str(&contents).map_err(|e| BootstrapError::InvalidPayload {
                reason: format!("malformed {MANIFEST_FILE_NAME}: {e}"),
            })?;
        manifest.validate(payload_dir)?;
        Ok(manifest)
    }

    fn validate(&self, payload_dir: &Path) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("`name` is empty"));
        }
        if parse_lenient(&self.version).is_none() {
            return Err(invalid(&format!("`version` {:?} is not a version", self.version)));
        }
        let entry = Path::new(&self.entry);
        let escapes = entry
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if self.entry.is_empty() || escapes {
            return Err(invalid(&format!(
                "`entry` {:?} must be a relative path inside the payload",
                self.entry
            )));
        }
        if !payload_dir.join(entry).is_file() {
            return Err(invalid(&format!("entry point {:?} is missing from the payload", self.entry)));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> BootstrapError {
    BootstrapError::InvalidPayload {
        reason: reason.to_string(),
    }
}
