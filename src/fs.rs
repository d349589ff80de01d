//! Filesystem seams of the generation runner: reading a generator tree and
//! writing generated files.

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks and special files.
    Other,
}

/// An entry of a generator tree, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self { path: path.into(), kind }
    }
}

/// Returned by a walk visitor to control descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    /// Do not descend into the directory just visited.
    SkipDir,
}

/// Read access to a generator tree.
pub trait FileTreeReader {
    /// Visits every entry below the root in lexical order, parents before children.
    ///
    /// Traversal failures are passed to the visitor, which decides whether to go on.
    fn walk(&self, visit: &mut dyn FnMut(Result<Entry>) -> Result<Visit>) -> Result<()>;

    /// Reads a file given by its path relative to the root.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Reads a generator tree from a local directory.
pub struct DirTreeReader {
    root: PathBuf,
}

impl DirTreeReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileTreeReader for DirTreeReader {
    fn walk(&self, visit: &mut dyn FnMut(Result<Entry>) -> Result<Visit>) -> Result<()> {
        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = walker.next() {
            let entry = next.map_err(|e| Error::WalkError(e.to_string())).and_then(|entry| {
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .map_err(|e| Error::WalkError(e.to_string()))?
                    .to_path_buf();
                let file_type = entry.file_type();
                let kind = if file_type.is_dir() {
                    EntryKind::Dir
                } else if file_type.is_file() {
                    EntryKind::File
                } else {
                    EntryKind::Other
                };
                Ok(Entry::new(relative, kind))
            });

            let is_dir = matches!(&entry, Ok(e) if e.kind == EntryKind::Dir);
            if visit(entry)? == Visit::SkipDir && is_dir {
                walker.skip_current_dir();
            }
        }
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(self.root.join(path)).map_err(Error::IoError)
    }
}

/// Write access to the destination tree.
pub trait Writer {
    /// Writes `content` to `path`, creating parent directories as needed.
    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;
}

/// Writes generated files to disk.
#[derive(Debug, Default)]
pub struct FsWriter;

impl Writer for FsWriter {
    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::IoError)?;
        }
        debug!("Writing {} bytes to {}", content.len(), path.display());
        fs::write(path, content).map_err(Error::IoError)
    }
}

/// Logs targets instead of writing them, for `--dry` runs.
#[derive(Debug, Default)]
pub struct DryRunWriter;

impl Writer for DryRunWriter {
    fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        info!("[DRY RUN] Would write {} bytes to {}", content.len(), path.display());
        Ok(())
    }
}
