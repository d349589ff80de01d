//! Entries of the generator tree that are never visited or emitted.
//!
//! Rules are exact paths relative to the generator root. A directory rule
//! prunes the whole subtree, so nothing below it is ever materialized.

use log::debug;
use std::path::{Component, Path, PathBuf};

use crate::constants::{MANIFEST_FILE, VCS_DIR};
use crate::fs::{Entry, EntryKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule {
    pub path: PathBuf,
    pub kind: IgnoreKind,
}

impl IgnoreRule {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self { path: normalize(path.as_ref()), kind: IgnoreKind::File }
    }

    pub fn dir(path: impl AsRef<Path>) -> Self {
        Self { path: normalize(path.as_ref()), kind: IgnoreKind::Dir }
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        let kind_matches = match self.kind {
            IgnoreKind::File => entry.kind != EntryKind::Dir,
            IgnoreKind::Dir => entry.kind == EntryKind::Dir,
        };
        kind_matches && normalize(&entry.path) == self.path
    }
}

/// The set of ignore rules of one run; always contains the manifest and the
/// version-control directory.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    rules: Vec<IgnoreRule>,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnoreRules {
    pub fn new() -> Self {
        Self { rules: vec![IgnoreRule::file(MANIFEST_FILE), IgnoreRule::dir(VCS_DIR)] }
    }

    pub fn add(&mut self, rule: IgnoreRule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    /// Adds user-declared paths relative to `root`.
    ///
    /// A trailing `/` or an existing directory under `root` makes a directory
    /// rule; anything else is a file rule.
    pub fn add_paths<I, S>(&mut self, root: &Path, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = path.as_ref();
            let rule = if path.ends_with('/') || root.join(path).is_dir() {
                IgnoreRule::dir(path)
            } else {
                IgnoreRule::file(path)
            };
            debug!("Ignoring {:?} {}", rule.kind, rule.path.display());
            self.add(rule);
        }
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        self.rules.iter().any(|rule| rule.matches(entry))
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir))
        .collect()
}
