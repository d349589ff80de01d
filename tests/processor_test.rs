use std::fs;
use std::path::Path;

use accio::blueprint::Context;
use accio::error::Error;
use accio::fs::{DirTreeReader, DryRunWriter, FsWriter};
use accio::ignore::IgnoreRules;
use accio::processor::{Action, AlwaysOverwrite, NeverOverwrite, Processor};
use accio::renderer::HandlebarsRenderer;
use indexmap::IndexMap;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

fn context(name: &str) -> Context {
    let mut answers = IndexMap::new();
    answers.insert("name".to_string(), serde_json::json!(name));
    Context::from_answers(&answers).unwrap()
}

fn generator() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, ".accio.toml", "help = \"demo\"\n");
    write(root, ".git/HEAD", "ref: refs/heads/main\n");
    write(root, "README.md", "static {{name}}\n");
    write(root, "src/main.rs.accio", "template <<\nfn main() { println!(\"{{name}}\"); }\n>>\n");
    write(root, "src/skipped.rs.accio", "skipif << True >>\ntemplate << never >>\n");
    write(
        root,
        "escape.txt.accio",
        "filename << '../../../custom.txt' >>\ntemplate << contained >>\n",
    );
    write(root, ".accio", "not a blueprint\n");
    dir
}

#[test_log::test]
fn test_generates_tree() {
    let source = generator();
    let output = TempDir::new().unwrap();
    let reader = DirTreeReader::new(source.path());
    let renderer = HandlebarsRenderer::new();
    let context = context("demo");

    let report = Processor::new(&reader, &FsWriter, &renderer, &context, output.path())
        .run()
        .unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(read(output.path(), "README.md"), "static {{name}}\n");
    assert_eq!(read(output.path(), "src/main.rs"), "fn main() { println!(\"demo\"); }\n");
    assert_eq!(read(output.path(), "custom.txt"), "contained");
    assert_eq!(read(output.path(), ".accio"), "not a blueprint\n");
    assert!(!output.path().join("src/skipped.rs").exists());
    assert!(!output.path().join("src/main.rs.accio").exists());
    assert!(!output.path().join(".accio.toml").exists());
    assert!(!output.path().join(".git").exists());

    assert_eq!(report.count(Action::Rendered), 2);
    assert_eq!(report.count(Action::Copied), 2);
    assert_eq!(report.count(Action::Skipped), 1);
}

#[test_log::test]
fn test_filename_into_existing_directory() {
    let source = TempDir::new().unwrap();
    write(source.path(), "lib.rs.accio", "filename << 'src' >>\ntemplate << lib >>\n");
    write(source.path(), "mod.rs.accio", "filename << 'nested/' >>\ntemplate << mod >>\n");
    let output = TempDir::new().unwrap();
    fs::create_dir(output.path().join("src")).unwrap();

    let reader = DirTreeReader::new(source.path());
    let renderer = HandlebarsRenderer::new();
    let context = Context::new();
    Processor::new(&reader, &FsWriter, &renderer, &context, output.path()).run().unwrap();

    assert_eq!(read(output.path(), "src/lib.rs"), "lib");
    assert_eq!(read(output.path(), "nested/mod.rs"), "mod");
}

#[test_log::test]
fn test_second_run_is_idempotent() {
    let source = generator();
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let reader = DirTreeReader::new(source.path());
    let renderer = HandlebarsRenderer::new();
    let context = context("demo");

    Processor::new(&reader, &FsWriter, &renderer, &context, first.path()).run().unwrap();
    Processor::new(&reader, &FsWriter, &renderer, &context, second.path()).run().unwrap();

    let report = Processor::new(&reader, &FsWriter, &renderer, &context, second.path())
        .with_overwrite_policy(NeverOverwrite)
        .run()
        .unwrap();
    assert_eq!(report.count(Action::Kept), 4);
    assert!(!dir_diff::is_different(first.path(), second.path()).unwrap());

    Processor::new(&reader, &FsWriter, &renderer, &context, second.path())
        .with_overwrite_policy(AlwaysOverwrite)
        .run()
        .unwrap();
    assert!(!dir_diff::is_different(first.path(), second.path()).unwrap());
}

#[test_log::test]
fn test_existing_files_are_kept_by_default() {
    let source = generator();
    let output = TempDir::new().unwrap();
    write(output.path(), "README.md", "mine\n");

    let reader = DirTreeReader::new(source.path());
    let renderer = HandlebarsRenderer::new();
    let context = context("demo");
    let report = Processor::new(&reader, &FsWriter, &renderer, &context, output.path())
        .run()
        .unwrap();

    assert_eq!(read(output.path(), "README.md"), "mine\n");
    assert_eq!(report.count(Action::Kept), 1);

    let asked = std::cell::RefCell::new(Vec::new());
    Processor::new(&reader, &FsWriter, &renderer, &context, output.path())
        .with_overwrite_policy(|target: &Path| {
            asked.borrow_mut().push(target.to_path_buf());
            target.ends_with("README.md")
        })
        .run()
        .unwrap();
    assert_eq!(read(output.path(), "README.md"), "static {{name}}\n");
    assert_eq!(asked.borrow().len(), 4);
}

#[test_log::test]
fn test_ignored_directories_are_pruned() {
    let source = generator();
    write(source.path(), "docs/guide/index.md", "guide\n");
    write(source.path(), "docs/keep.md.accio", "template << {{name}} >>\n");
    let output = TempDir::new().unwrap();

    let mut rules = IgnoreRules::new();
    rules.add_paths(source.path(), ["docs", "README.md"]);

    let reader = DirTreeReader::new(source.path());
    let renderer = HandlebarsRenderer::new();
    let context = context("demo");
    Processor::new(&reader, &FsWriter, &renderer, &context, output.path())
        .with_ignore_rules(rules)
        .run()
        .unwrap();

    assert!(!output.path().join("docs").exists());
    assert!(!output.path().join("README.md").exists());
    assert!(output.path().join("src/main.rs").exists());
}

#[test_log::test]
fn test_first_failure_aborts() {
    let source = TempDir::new().unwrap();
    write(source.path(), "a.txt.accio", "variable -name=\"x\" << 1 // 0 >>\n");
    write(source.path(), "b.txt", "b\n");
    let output = TempDir::new().unwrap();

    let reader = DirTreeReader::new(source.path());
    let renderer = HandlebarsRenderer::new();
    let context = Context::new();
    let err = Processor::new(&reader, &FsWriter, &renderer, &context, output.path())
        .run()
        .unwrap_err();

    match err {
        Error::ParseError { path, source } => {
            assert_eq!(path, Path::new("a.txt.accio"));
            assert_eq!(source.line, 1);
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
    assert!(!output.path().join("b.txt").exists());
}

#[test_log::test]
fn test_ignore_errors_collects_failures() {
    let source = TempDir::new().unwrap();
    write(source.path(), "a.txt.accio", "variable -name=\"x\" << 1 // 0 >>\n");
    write(source.path(), "b.txt", "b\n");
    write(source.path(), "c.txt.accio", "filename << 3 >>\n");
    let output = TempDir::new().unwrap();

    let reader = DirTreeReader::new(source.path());
    let renderer = HandlebarsRenderer::new();
    let context = Context::new();
    let report = Processor::new(&reader, &FsWriter, &renderer, &context, output.path())
        .ignore_errors(true)
        .run()
        .unwrap();

    assert_eq!(report.failures.len(), 2);
    assert_eq!(read(output.path(), "b.txt"), "b\n");
    assert!(!output.path().join("a.txt").exists());
}

#[test_log::test]
fn test_dry_run_writes_nothing() {
    let source = generator();
    let output = TempDir::new().unwrap();

    let reader = DirTreeReader::new(source.path());
    let renderer = HandlebarsRenderer::new();
    let context = context("demo");
    let report = Processor::new(&reader, &DryRunWriter, &renderer, &context, output.path())
        .with_overwrite_policy(AlwaysOverwrite)
        .run()
        .unwrap();

    assert_eq!(report.count(Action::Rendered), 2);
    assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
}

#[cfg(unix)]
#[test_log::test]
fn test_symlinks_are_not_materialized() {
    let source = TempDir::new().unwrap();
    write(source.path(), "real.txt", "real\n");
    write(source.path(), "dir/inner.txt", "inner\n");
    std::os::unix::fs::symlink(source.path().join("real.txt"), source.path().join("link.txt"))
        .unwrap();
    std::os::unix::fs::symlink(source.path().join("dir"), source.path().join("linked-dir"))
        .unwrap();
    let output = TempDir::new().unwrap();

    let reader = DirTreeReader::new(source.path());
    let renderer = HandlebarsRenderer::new();
    let context = Context::new();
    let report = Processor::new(&reader, &FsWriter, &renderer, &context, output.path())
        .run()
        .unwrap();

    assert!(!output.path().join("link.txt").exists());
    assert!(!output.path().join("linked-dir").exists());
    assert_eq!(read(output.path(), "real.txt"), "real\n");
    let sources: Vec<&Path> = report.results.iter().map(|r| r.source.as_path()).collect();
    assert_eq!(sources, vec![Path::new("dir/inner.txt"), Path::new("real.txt")]);
}
