// Low-level helpers used across the installer.
// None of these know about install runs; they deal in paths, archives and versions.

pub mod compression;
pub mod file_operations;
pub mod path_helpers;
pub mod platform;
pub mod timestamps;
pub mod versions;
