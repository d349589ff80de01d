//! accio is a blueprint-driven boilerplate generator.
//! It turns a generator tree into concrete files, evaluating per-file
//! blueprints against answers collected from the user.

/// Blueprint assembly: markup parsing, context handling and tag evaluation
pub mod blueprint;

/// Command-line interface module for the accio application
pub mod cli;

/// Well-known file names and suffixes
pub mod constants;

/// Error types and handling for the accio application
pub mod error;

/// Generator tree reading and output writing
pub mod fs;

/// Paths that are never visited or generated
pub mod ignore;

/// Generator acquisition from local directories and git repositories
pub mod loader;

/// Logger initialization for the binary
pub mod logger;

/// Generator manifest loading and validation
/// Reads `.accio.toml` at the generator root
pub mod manifest;

/// The generation runner
/// Walks the generator tree and materializes the output
pub mod processor;

/// User input and interaction handling
pub mod prompt;

/// Template rendering behind the `template` tag
pub mod renderer;

/// The embedded scripting language of tag bodies
pub mod script;
