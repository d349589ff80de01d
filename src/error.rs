//! Error handling for the accio application.
//! Defines custom error types and results used throughout the application.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Category of a failure raised while turning one source file into a blueprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Malformed tag, attribute or delimiter structure.
    Syntax,
    /// Script syntax or runtime failure.
    Eval,
    /// Template or partial resolution failure.
    Render,
    /// A tag body produced a value of the wrong kind.
    Type,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParseErrorKind::Syntax => "syntax error",
            ParseErrorKind::Eval => "evaluation error",
            ParseErrorKind::Render => "render error",
            ParseErrorKind::Type => "type error",
        };
        f.write_str(name)
    }
}

/// A blueprint failure, located at the tag that caused it.
///
/// `line` is always the 1-based line of the source file, never a position
/// inside the script or template fragment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{tag} tag, line {line}: {msg}")]
pub struct ParseError {
    pub tag: String,
    pub line: usize,
    pub msg: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new<T: Into<String>, M: Into<String>>(
        kind: ParseErrorKind,
        tag: T,
        line: usize,
        msg: M,
    ) -> Self {
        Self { tag: tag.into(), line, msg: msg.into(), kind }
    }
}

/// Custom error types for accio operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// A source file could not be turned into a blueprint
    #[error("Failed to process '{path}': {source}.")]
    ParseError {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// A host value has no script counterpart
    #[error("Marshal error: {0}.")]
    MarshalError(String),

    /// Template rendering failed
    #[error("Render error: {0}.")]
    RenderError(String),

    /// The manifest is missing required structure or is not valid TOML
    #[error("Manifest error: {0}.")]
    ManifestError(String),

    /// Represents validation failures in user input or data
    #[error("Validation error: {0}.")]
    ValidationError(String),

    /// Interactive prompting failed
    #[error("Prompt error: {0}.")]
    PromptError(String),

    /// The generator location is neither a directory nor a repository URL
    #[error("Invalid location: {0}.")]
    LocationError(String),

    #[error("Template directory '{template_dir}' does not exist.")]
    TemplateDoesNotExistsError { template_dir: String },

    /// Represents errors that occur during git operations
    #[error("Git error: {0}.")]
    Git2Error(#[from] git2::Error),

    /// The generator tree could not be traversed
    #[error("Walk error: {0}.")]
    WalkError(String),

    /// A single entry of the generator tree failed
    #[error("Failed to process '{path}': {source}")]
    ProcessError {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// The run completed in ignore-errors mode but some entries failed
    #[error("{failures} file(s) failed to generate.")]
    RunFailedError { failures: usize },
}

/// Convenience type alias for Results with Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
