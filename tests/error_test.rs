use std::io;
use std::path::PathBuf;

use accio::error::{Error, ParseError, ParseErrorKind};

#[test]
fn test_error_conversion() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let accio_err: Error = io_err.into();

    match accio_err {
        Error::IoError(_) => (),
        _ => panic!("Expected IoError variant"),
    }
}

#[test]
fn test_error_display() {
    let err = Error::ManifestError("invalid manifest".to_string());
    assert_eq!(err.to_string(), "Manifest error: invalid manifest.");

    let err = Error::RenderError("line 1: unclosed tag".to_string());
    assert_eq!(err.to_string(), "Render error: line 1: unclosed tag.");

    let err = Error::RunFailedError { failures: 2 };
    assert_eq!(err.to_string(), "2 file(s) failed to generate.");
}

#[test]
fn test_parse_error_display() {
    let err = ParseError::new(ParseErrorKind::Eval, "variable", 12, "undefined: x");
    assert_eq!(err.to_string(), "variable tag, line 12: undefined: x");
    assert_eq!(ParseErrorKind::Type.to_string(), "type error");

    let wrapped = Error::ParseError { path: PathBuf::from("src/main.rs.accio"), source: err };
    assert_eq!(
        wrapped.to_string(),
        "Failed to process 'src/main.rs.accio': variable tag, line 12: undefined: x."
    );
}

#[test]
fn test_process_error_keeps_source() {
    let inner = Error::IoError(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
    let err = Error::ProcessError { path: PathBuf::from("a.txt"), source: Box::new(inner) };
    assert!(err.to_string().starts_with("Failed to process 'a.txt': IO error: "));
    assert!(std::error::Error::source(&err).is_some());
}
