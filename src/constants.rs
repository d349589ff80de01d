//! Common constants used throughout the accio application.

/// Suffix marking a source file as a blueprint; stripped from the output name
pub const BLUEPRINT_SUFFIX: &str = ".accio";

/// Generator manifest file name
pub const MANIFEST_FILE: &str = ".accio.toml";

/// Version-control metadata directory, never copied into the output
pub const VCS_DIR: &str = ".git";
