use accio::cli::{Args, Command, RunOptions};
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

fn make_args(args: &[&str]) -> Vec<OsString> {
    let mut res = vec![OsString::from("accio")];
    res.extend(args.iter().map(OsString::from));
    res
}

fn run_options(args: &[&str]) -> RunOptions {
    let parsed = Args::try_parse_from(make_args(args)).unwrap();
    match parsed.command {
        Command::Run(run) => run.into(),
    }
}

#[test]
fn test_basic_args() {
    let options = run_options(&["run", "./generator"]);

    assert_eq!(options.location, "./generator");
    assert_eq!(options.working_dir, PathBuf::from("."));
    assert!(!options.dry);
    assert!(!options.force);
    assert!(!options.ignore_errors);
    assert!(options.ignore.is_empty());
}

#[test]
fn test_all_flags() {
    let args = make_args(&[
        "--verbose",
        "run",
        "--dry",
        "--force",
        "--ignore-errors",
        "--working-dir",
        "./out",
        "--ignore",
        "docs/",
        "--ignore",
        "README.md",
        "./generator",
    ]);
    let parsed = Args::try_parse_from(args).unwrap();
    assert!(parsed.verbose);

    let Command::Run(run) = parsed.command;
    let options = RunOptions::from(run);
    assert!(options.dry);
    assert!(options.force);
    assert!(options.ignore_errors);
    assert_eq!(options.working_dir, PathBuf::from("./out"));
    assert_eq!(options.ignore, vec!["docs/".to_string(), "README.md".to_string()]);
}

#[test]
fn test_short_flags() {
    let options = run_options(&["run", "-f", "-i", "-w", "target", "./generator"]);

    assert!(options.force);
    assert!(options.ignore_errors);
    assert_eq!(options.working_dir, PathBuf::from("target"));
}

#[test]
fn test_verbose_is_global() {
    let parsed = Args::try_parse_from(make_args(&["run", "./generator", "-v"])).unwrap();
    assert!(parsed.verbose);
}

#[test]
fn test_git_url_location() {
    let options = run_options(&["run", "https://github.com/user/generator.git#v1"]);
    assert_eq!(options.location, "https://github.com/user/generator.git#v1");
}

#[test]
fn test_missing_args() {
    assert!(Args::try_parse_from(make_args(&[])).is_err());
    assert!(Args::try_parse_from(make_args(&["run"])).is_err());
}

#[test]
fn test_too_many_args() {
    assert!(Args::try_parse_from(make_args(&["run", "./generator", "extra"])).is_err());
}
