// `pkm-bootstrap version`: prints the installer's own version.

use crate::libs::utilities::platform::{detect_architecture, detect_os};
use crate::log_debug;

/// Main function for the `version` command.
pub fn run() {
    println!("pkm-bootstrap {}", env!("CARGO_PKG_VERSION"));
    log_debug!("[Version] Built for {} / {}", detect_os(), detect_architecture());
}
