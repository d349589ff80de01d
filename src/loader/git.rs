use log::debug;
use std::path::{Component, Path};
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::loader::interface::TemplateLoader;
use crate::loader::location::RemoteLocation;
use crate::loader::LoadedTemplate;

/// Loader for generators in git repositories.
///
/// The repository is cloned into a temporary directory that is removed when
/// the returned [`LoadedTemplate`] is dropped.
pub struct GitLoader {
    location: RemoteLocation,
}

impl GitLoader {
    pub fn new(location: RemoteLocation) -> Self {
        Self { location }
    }

    fn clone_into(&self, checkout: &TempDir) -> Result<git2::Repository> {
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|_url, username_from_url, allowed_types| {
            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
            } else {
                git2::Cred::default()
            }
        });

        let mut fetch_opts = git2::FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);

        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        builder.clone(&self.location.url, checkout.path()).map_err(Error::Git2Error)
    }
}

/// Checks out `reference` as a detached HEAD, trying remote branches too.
fn checkout_reference(repo: &git2::Repository, reference: &str) -> Result<()> {
    let (object, _) = repo
        .revparse_ext(reference)
        .or_else(|_| repo.revparse_ext(&format!("origin/{reference}")))?;
    let commit = object.peel_to_commit()?;
    repo.checkout_tree(commit.as_object(), Some(git2::build::CheckoutBuilder::new().force()))?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}

/// Whether `subdir` stays inside the checkout once joined to it.
fn stays_inside(subdir: &Path) -> bool {
    subdir.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl TemplateLoader for GitLoader {
    fn load(&self) -> Result<LoadedTemplate> {
        if let Some(subdir) = &self.location.subdir {
            if !stays_inside(subdir) {
                return Err(Error::LocationError(format!(
                    "'{}' has a subdirectory that leaves the repository",
                    self.location
                )));
            }
        }
        let checkout = tempfile::Builder::new().prefix("accio-").tempdir()?;
        debug!("Cloning '{}' into '{}'", self.location.url, checkout.path().display());

        let repo = self.clone_into(&checkout)?;
        if let Some(reference) = &self.location.reference {
            debug!("Checking out '{reference}'");
            checkout_reference(&repo, reference)?;
        }

        let root = match &self.location.subdir {
            Some(subdir) => checkout.path().join(subdir),
            None => checkout.path().to_path_buf(),
        };
        if !root.is_dir() {
            return Err(Error::TemplateDoesNotExistsError {
                template_dir: self.location.to_string(),
            });
        }
        Ok(LoadedTemplate::remote(root, checkout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_subdir_escaping_checkout_is_rejected() {
        let loader = GitLoader::new(RemoteLocation {
            url: "file:///nonexistent/repo".to_string(),
            reference: None,
            subdir: Some(PathBuf::from("generators/../../outside")),
        });
        assert!(matches!(loader.load(), Err(Error::LocationError(_))));
    }

    #[test]
    fn test_stays_inside() {
        assert!(stays_inside(Path::new("generators/./api")));
        assert!(!stays_inside(Path::new("../api")));
        assert!(!stays_inside(Path::new("/etc")));
    }
}
