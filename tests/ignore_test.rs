use accio::fs::{Entry, EntryKind};
use accio::ignore::{IgnoreKind, IgnoreRule, IgnoreRules};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_rules() {
    let rules = IgnoreRules::new();

    assert!(rules.matches(&Entry::new(".accio.toml", EntryKind::File)));
    assert!(rules.matches(&Entry::new(".git", EntryKind::Dir)));
    assert!(!rules.matches(&Entry::new(".git", EntryKind::File)));
    assert!(!rules.matches(&Entry::new("nested/.accio.toml", EntryKind::File)));
    assert!(!rules.matches(&Entry::new("README.md", EntryKind::File)));
}

#[test]
fn test_add_paths() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join("assets")).unwrap();

    let mut rules = IgnoreRules::new();
    rules.add_paths(temp_dir.path(), ["docs/", "assets", "notes.txt", "./notes.txt"]);

    assert!(rules.matches(&Entry::new("docs", EntryKind::Dir)));
    assert!(rules.matches(&Entry::new("assets", EntryKind::Dir)));
    assert!(rules.matches(&Entry::new("notes.txt", EntryKind::File)));
    assert!(!rules.matches(&Entry::new("docs", EntryKind::File)));
    assert!(!rules.matches(&Entry::new("docs/index.md", EntryKind::File)));
    assert_eq!(rules.rules().len(), 5);
}

#[test]
fn test_rule_kinds() {
    let file = IgnoreRule::file("a/b");
    assert_eq!(file.kind, IgnoreKind::File);
    assert!(file.matches(&Entry::new("a/b", EntryKind::File)));
    assert!(file.matches(&Entry::new("a/b", EntryKind::Other)));
    assert!(!file.matches(&Entry::new("a/b", EntryKind::Dir)));

    let dir = IgnoreRule::dir("./a/");
    assert!(dir.matches(&Entry::new("a", EntryKind::Dir)));
}
