//! Normalization of remote generator locations.
//!
//! Accepted forms:
//! - `https://host/owner/repo`, `ssh://git@host/owner/repo`, `git://...`, `file://...`
//! - `git@host:owner/repo` (scp-style, becomes `ssh://git@host/owner/repo`)
//! - `github.com/owner/repo` (known hosts, becomes `https://github.com/owner/repo`)
//!
//! Any of them may be followed by `//sub/dir` to select a subdirectory and
//! `#ref` to select a branch, tag or commit.

use regex::Regex;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

use crate::error::{Error, Result};

const KNOWN_HOSTS: [&str; 3] = ["github.com", "gitlab.com", "bitbucket.org"];
const SCHEMES: [&str; 5] = ["https", "http", "ssh", "git", "file"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    /// Clone URL.
    pub url: String,
    /// Branch, tag or commit to check out.
    pub reference: Option<String>,
    /// Generator root inside the repository.
    pub subdir: Option<PathBuf>,
}

impl fmt::Display for RemoteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)?;
        if let Some(subdir) = &self.subdir {
            write!(f, "//{}", subdir.display())?;
        }
        if let Some(reference) = &self.reference {
            write!(f, "#{reference}")?;
        }
        Ok(())
    }
}

fn invalid(location: &str, reason: &str) -> Error {
    Error::LocationError(format!("'{location}' {reason}"))
}

/// Parses a remote location into its clone URL, ref and subdirectory.
///
/// # Arguments
/// * `location` - Location as given on the command line
///
/// # Returns
/// * `Result<RemoteLocation>` - Normalized location, or a `LocationError`
pub fn parse_remote(location: &str) -> Result<RemoteLocation> {
    let (rest, reference) = match location.rsplit_once('#') {
        Some((rest, reference)) if !reference.is_empty() => (rest, Some(reference.to_string())),
        Some(_) => return Err(invalid(location, "has an empty ref after '#'")),
        None => (location, None),
    };

    let normalized = normalize_scheme(rest)?
        .ok_or_else(|| invalid(location, "is neither an existing directory nor a repository URL"))?;

    let (scheme, remainder) = normalized
        .split_once("://")
        .ok_or_else(|| invalid(location, "is not a valid repository URL"))?;
    let (repository, subdir) = match remainder.split_once("//") {
        Some((repository, subdir)) => (repository, Some(subdir)),
        None => (remainder, None),
    };

    let url = format!("{scheme}://{repository}");
    let parsed = Url::parse(&url).map_err(|e| invalid(location, &e.to_string()))?;
    if parsed.scheme() != "file" && parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid(location, "has no host"));
    }
    let subdir = subdir.map(|s| validate_subdir(location, s)).transpose()?;

    Ok(RemoteLocation { url, reference, subdir })
}

/// Returns the location with an explicit scheme, or `None` if it does not
/// look like a repository at all.
fn normalize_scheme(location: &str) -> Result<Option<String>> {
    if let Some((scheme, _)) = location.split_once("://") {
        if !SCHEMES.contains(&scheme) {
            return Err(invalid(location, &format!("uses unsupported scheme '{scheme}'")));
        }
        return Ok(Some(location.to_string()));
    }

    let scp = Regex::new(r"^(?P<user>[A-Za-z0-9._-]+)@(?P<host>[A-Za-z0-9.-]+):(?P<path>[^/].*)$")
        .map_err(|e| Error::LocationError(e.to_string()))?;
    if let Some(captures) = scp.captures(location) {
        return Ok(Some(format!(
            "ssh://{}@{}/{}",
            &captures["user"], &captures["host"], &captures["path"]
        )));
    }

    let host = location.split('/').next().unwrap_or_default();
    if KNOWN_HOSTS.contains(&host) {
        return Ok(Some(format!("https://{location}")));
    }
    Ok(None)
}

fn validate_subdir(location: &str, subdir: &str) -> Result<PathBuf> {
    let path = Path::new(subdir);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => clean.push(segment),
            Component::CurDir => {}
            _ => return Err(invalid(location, "has a subdirectory that leaves the repository")),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(invalid(location, "has an empty subdirectory after '//'"));
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scp_style_becomes_ssh() {
        let location = parse_remote("git@github.com:owner/repo.git").unwrap();
        assert_eq!(location.url, "ssh://git@github.com/owner/repo.git");
        assert_eq!(location.reference, None);
        assert_eq!(location.subdir, None);
    }

    #[test]
    fn test_known_host_gets_https() {
        let location = parse_remote("github.com/owner/repo").unwrap();
        assert_eq!(location.url, "https://github.com/owner/repo");
    }

    #[test]
    fn test_subdir_and_ref() {
        let location = parse_remote("https://gitlab.com/owner/repo//generators/rust#v1.2").unwrap();
        assert_eq!(location.url, "https://gitlab.com/owner/repo");
        assert_eq!(location.subdir, Some(PathBuf::from("generators/rust")));
        assert_eq!(location.reference.as_deref(), Some("v1.2"));
        assert_eq!(location.to_string(), "https://gitlab.com/owner/repo//generators/rust#v1.2");
    }

    #[test]
    fn test_rejects_unknown_forms() {
        assert!(parse_remote("./does/not/exist").is_err());
        assert!(parse_remote("example.org/owner/repo").is_err());
        assert!(parse_remote("ftp://example.org/repo").is_err());
        assert!(parse_remote("github.com/owner/repo#").is_err());
        assert!(parse_remote("github.com/owner/repo//../up").is_err());
    }
}
