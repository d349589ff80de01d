//! The generation runner.
//!
//! Walks a generator tree, turns blueprint files into their output, copies
//! everything else verbatim, and materializes the result under the output
//! root. Output paths can never escape the root.

use log::{debug, info, warn};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::blueprint::{BlueprintOptions, BlueprintParser, Context};
use crate::constants::BLUEPRINT_SUFFIX;
use crate::error::{Error, Result};
use crate::fs::{Entry, EntryKind, FileTreeReader, Visit, Writer};
use crate::ignore::IgnoreRules;
use crate::prompt::Prompter;
use crate::renderer::TemplateRenderer;

/// Decides whether an existing target may be replaced.
pub trait OverwritePolicy {
    fn should_overwrite(&self, target: &Path) -> Result<bool>;
}

impl<F: Fn(&Path) -> bool> OverwritePolicy for F {
    fn should_overwrite(&self, target: &Path) -> Result<bool> {
        Ok(self(target))
    }
}

/// Replaces every existing target.
#[derive(Debug, Default)]
pub struct AlwaysOverwrite;

impl OverwritePolicy for AlwaysOverwrite {
    fn should_overwrite(&self, _target: &Path) -> Result<bool> {
        Ok(true)
    }
}

/// Keeps every existing target.
#[derive(Debug, Default)]
pub struct NeverOverwrite;

impl OverwritePolicy for NeverOverwrite {
    fn should_overwrite(&self, _target: &Path) -> Result<bool> {
        Ok(false)
    }
}

/// Asks the user about every existing target.
pub struct PromptOverwrite<'a> {
    prompter: &'a dyn Prompter,
}

impl<'a> PromptOverwrite<'a> {
    pub fn new(prompter: &'a dyn Prompter) -> Self {
        Self { prompter }
    }
}

impl OverwritePolicy for PromptOverwrite<'_> {
    fn should_overwrite(&self, target: &Path) -> Result<bool> {
        self.prompter.confirm(
            &format!("File '{}' already exists. Overwrite?", target.display()),
            None,
            false,
        )
    }
}

/// What happened to one source entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Copied verbatim.
    Copied,
    /// Generated from a blueprint.
    Rendered,
    /// A blueprint asked not to be generated.
    Skipped,
    /// The target existed and the overwrite policy declined.
    Kept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Copied => "Copied",
            Action::Rendered => "Rendered",
            Action::Skipped => "Skipped",
            Action::Kept => "Kept",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Source path relative to the generator root.
    pub source: PathBuf,
    /// `None` when nothing was generated for the entry.
    pub target: Option<PathBuf>,
    pub action: Action,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<ProcessResult>,
    /// Failures collected in ignore-errors mode.
    pub failures: Vec<Error>,
}

impl RunReport {
    pub fn count(&self, action: Action) -> usize {
        self.results.iter().filter(|r| r.action == action).count()
    }
}

/// Main processor for a generation run.
pub struct Processor<'a> {
    reader: &'a dyn FileTreeReader,
    writer: &'a dyn Writer,
    parser: BlueprintParser<'a>,
    context: &'a Context,
    output_root: PathBuf,
    ignore: IgnoreRules,
    overwrite: Box<dyn OverwritePolicy + 'a>,
    ignore_errors: bool,
}

impl<'a> Processor<'a> {
    /// Creates a processor that keeps existing files and stops at the first failure.
    ///
    /// # Arguments
    /// * `reader` - Generator tree
    /// * `writer` - Destination of generated files
    /// * `renderer` - Engine behind the `template` tag
    /// * `context` - Base context built from the answers
    /// * `output_root` - Root every target is contained in
    pub fn new(
        reader: &'a dyn FileTreeReader,
        writer: &'a dyn Writer,
        renderer: &'a dyn TemplateRenderer,
        context: &'a Context,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reader,
            writer,
            parser: BlueprintParser::new(renderer),
            context,
            output_root: output_root.into(),
            ignore: IgnoreRules::new(),
            overwrite: Box::new(NeverOverwrite),
            ignore_errors: false,
        }
    }

    pub fn with_ignore_rules(mut self, rules: IgnoreRules) -> Self {
        self.ignore = rules;
        self
    }

    pub fn with_overwrite_policy(mut self, policy: impl OverwritePolicy + 'a) -> Self {
        self.overwrite = Box::new(policy);
        self
    }

    pub fn with_options(mut self, options: BlueprintOptions) -> Self {
        self.parser = self.parser.with_options(options);
        self
    }

    /// In ignore-errors mode file-level failures are collected and the walk goes on.
    pub fn ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    /// Processes the whole generator tree in lexical order.
    pub fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        self.reader.walk(&mut |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.record_failure(&mut report, PathBuf::new(), e)?;
                    return Ok(Visit::Continue);
                }
            };

            if self.ignore.matches(&entry) {
                debug!("Ignoring '{}'", entry.path.display());
                return Ok(match entry.kind {
                    EntryKind::Dir => Visit::SkipDir,
                    _ => Visit::Continue,
                });
            }

            match self.process(&entry) {
                Ok(Some(result)) => report.results.push(result),
                Ok(None) => {}
                Err(e) => self.record_failure(&mut report, entry.path.clone(), e)?,
            }
            Ok(Visit::Continue)
        })?;

        Ok(report)
    }

    fn record_failure(&self, report: &mut RunReport, path: PathBuf, e: Error) -> Result<()> {
        let failure = match e {
            e @ Error::ParseError { .. } => e,
            e => Error::ProcessError { path, source: Box::new(e) },
        };
        if !self.ignore_errors {
            return Err(failure);
        }
        warn!("{failure}");
        report.failures.push(failure);
        Ok(())
    }

    /// Processes a single entry; directories and special files produce nothing.
    pub fn process(&self, entry: &Entry) -> Result<Option<ProcessResult>> {
        match entry.kind {
            EntryKind::Dir => {
                debug!("Entering '{}'", entry.path.display());
                return Ok(None);
            }
            EntryKind::Other => {
                debug!("Skipping non-regular entry '{}'", entry.path.display());
                return Ok(None);
            }
            EntryKind::File => {}
        }

        let source = entry.path.clone();
        let file_name = entry.path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

        let (target, content, action) = match blueprint_stem(file_name) {
            Some(stem) => {
                debug!("Rendering blueprint '{}'", source.display());
                let bytes = self.reader.read_file(&source)?;
                let blueprint = self
                    .parser
                    .parse(&bytes, self.context)
                    .map_err(|e| Error::ParseError { path: source.clone(), source: e })?;

                if blueprint.skip {
                    debug!("Skipping '{}' as requested by its skipif tag", source.display());
                    return Ok(Some(ProcessResult { source, target: None, action: Action::Skipped }));
                }

                let target = if blueprint.filename.is_empty() {
                    self.output_root.join(source.with_file_name(stem))
                } else {
                    contained_path(&self.output_root, &blueprint.filename, stem)
                };
                (target, blueprint.body.into_bytes(), Action::Rendered)
            }
            None => {
                debug!("Copying '{}'", source.display());
                let bytes = self.reader.read_file(&source)?;
                (self.output_root.join(&source), bytes, Action::Copied)
            }
        };

        if target.exists() && !self.overwrite.should_overwrite(&target)? {
            info!("Keeping existing '{}'", target.display());
            return Ok(Some(ProcessResult { source, target: Some(target), action: Action::Kept }));
        }

        self.writer.write_file(&target, &content)?;
        info!("{action}: '{}'", target.display());
        Ok(Some(ProcessResult { source, target: Some(target), action }))
    }
}

/// Name of the output file for a blueprint, or `None` for a regular file.
fn blueprint_stem(file_name: &str) -> Option<&str> {
    file_name.strip_suffix(BLUEPRINT_SUFFIX).filter(|stem| !stem.is_empty())
}

/// Resolves a `filename` tag value against the output root.
///
/// The value is treated as rooted at `root`: `..` segments pop a previous
/// segment and are dropped once nothing is left, so the result is always
/// inside `root`. A value naming an existing directory, or ending in `/`,
/// gets `base_name` appended.
///
/// # Arguments
/// * `root` - Output root
/// * `filename` - Value produced by the `filename` tag
/// * `base_name` - Source file name without the blueprint suffix
///
/// # Returns
/// * `PathBuf` - Target path under `root`
pub fn contained_path(root: &Path, filename: &str, base_name: &str) -> PathBuf {
    let mut relative = PathBuf::new();
    for component in Path::new(filename).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::ParentDir => {
                relative.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    let target = root.join(relative);
    if target.is_dir() || filename.ends_with('/') {
        target.join(base_name)
    } else {
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_contained_path_clamps_parent_segments() {
        let root = Path::new("/out");
        assert_eq!(contained_path(root, "../../../custom.txt", "x"), root.join("custom.txt"));
        assert_eq!(contained_path(root, "a/../../b/c.txt", "x"), root.join("b/c.txt"));
        assert_eq!(contained_path(root, "/etc/passwd", "x"), root.join("etc/passwd"));
        assert_eq!(contained_path(root, "./a/./b", "x"), root.join("a/b"));
    }

    #[test]
    fn test_contained_path_appends_base_name_to_directories() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("src")).unwrap();
        assert_eq!(
            contained_path(temp.path(), "src", "main.rs"),
            temp.path().join("src/main.rs")
        );
        assert_eq!(
            contained_path(temp.path(), "lib/", "main.rs"),
            temp.path().join("lib/main.rs")
        );
        assert_eq!(contained_path(temp.path(), "..", "main.rs"), temp.path().join("main.rs"));
    }

    #[test]
    fn test_blueprint_stem() {
        assert_eq!(blueprint_stem("main.rs.accio"), Some("main.rs"));
        assert_eq!(blueprint_stem(".accio"), None);
        assert_eq!(blueprint_stem("main.rs"), None);
    }
}
