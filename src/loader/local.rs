use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::loader::interface::TemplateLoader;
use crate::loader::LoadedTemplate;

/// Loader for generators on the local filesystem.
pub struct LocalLoader {
    path: PathBuf,
}

impl LocalLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TemplateLoader for LocalLoader {
    /// # Errors
    /// * `Error::TemplateDoesNotExistsError` if the path is not a directory
    fn load(&self) -> Result<LoadedTemplate> {
        if !self.path.is_dir() {
            return Err(Error::TemplateDoesNotExistsError {
                template_dir: self.path.display().to_string(),
            });
        }
        Ok(LoadedTemplate::local(self.path.clone()))
    }
}
