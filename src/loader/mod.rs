//! Generator acquisition: local directories and remote git repositories.

use log::info;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::Result;
use crate::loader::git::GitLoader;
use crate::loader::interface::TemplateLoader;
use crate::loader::local::LocalLoader;
use crate::loader::location::{parse_remote, RemoteLocation};

pub mod git;
pub mod interface;
pub mod local;
pub mod location;

/// Represents the source location of a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Local filesystem directory
    FileSystem(PathBuf),
    /// Git repository
    Git(RemoteLocation),
}

impl std::fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::FileSystem(path) => {
                write!(f, "local path: '{}'", path.display())
            }
            TemplateSource::Git(location) => write!(f, "git repository: '{location}'"),
        }
    }
}

impl TemplateSource {
    /// Resolves a location string; existing directories take precedence over URLs.
    ///
    /// # Arguments
    /// * `location` - Directory path or repository URL
    ///
    /// # Returns
    /// * `Result<Self>` - The source, or a `LocationError`
    pub fn from_location(location: &str) -> Result<Self> {
        let path = Path::new(location);
        if path.is_dir() {
            return Ok(Self::FileSystem(path.to_path_buf()));
        }
        parse_remote(location).map(Self::Git)
    }
}

/// A generator available on the local filesystem.
#[derive(Debug)]
pub struct LoadedTemplate {
    root: PathBuf,
    /// Keeps a temporary checkout alive.
    _checkout: Option<TempDir>,
}

impl LoadedTemplate {
    pub fn local(root: PathBuf) -> Self {
        Self { root, _checkout: None }
    }

    pub fn remote(root: PathBuf, checkout: TempDir) -> Self {
        Self { root, _checkout: Some(checkout) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Returns the generator from the provided location.
pub fn load_template(location: &str) -> Result<LoadedTemplate> {
    let source = TemplateSource::from_location(location)?;
    info!("Using generator from the {source}");

    let loader: Box<dyn TemplateLoader> = match source {
        TemplateSource::Git(location) => Box::new(GitLoader::new(location)),
        TemplateSource::FileSystem(path) => Box::new(LocalLoader::new(path)),
    };

    loader.load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_source_display() {
        let fs_source = TemplateSource::FileSystem(PathBuf::from("/path/to/template"));
        assert_eq!(format!("{fs_source}"), "local path: '/path/to/template'");

        let git_source = TemplateSource::from_location("git@github.com:user/repo").unwrap();
        assert_eq!(
            format!("{git_source}"),
            "git repository: 'ssh://git@github.com/user/repo'"
        );
    }
}
