//! `pkm-bootstrap`: installs the pkm package manager into a self-contained
//! container that shares no files, search paths, or command names with other
//! package managers on the host.
//!
//! The core API is the four stages of an install run:
//! [`detect_environment`](libs::environment_detection::detect_environment),
//! [`resolve_install_target`](libs::target_resolver::resolve_install_target),
//! [`materialize`](libs::materializer::materialize) and
//! [`verify`](libs::verifier::verify), driven in order by
//! [`run_install`](libs::bootstrap_run::run_install).

pub mod cli;
pub mod commands;
pub mod error;
pub mod libs;
// Colored log_* macros, exported at the crate root.
pub mod logger;
pub mod schemas;
