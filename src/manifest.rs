//! Generator manifest (`.accio.toml`) loading and validation.
//!
//! ```toml
//! help = "Scaffolds a Rust service"
//! ignore = ["docs/"]
//!
//! [prompts.name]
//! type = "input"
//! message = "Service name"
//!
//! [prompts.license]
//! type = "choice"
//! message = "License"
//! options = ["MIT", "Apache-2.0"]
//! ```

use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::constants::MANIFEST_FILE;
use crate::error::{Error, Result};
use crate::prompt::{Prompt, PromptKind};

const MAX_PROMPT_NAME: usize = 64;
const MAX_MESSAGE: usize = 128;

/// A validated generator manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub help: Option<String>,
    /// Paths relative to the generator root that are never generated.
    pub ignore: Vec<String>,
    /// Prompts in declaration order.
    pub prompts: IndexMap<String, Prompt>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    help: Option<String>,
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default)]
    prompts: IndexMap<String, RawPrompt>,
}

#[derive(Debug, Deserialize)]
struct RawPrompt {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
    help: Option<String>,
    options: Option<Vec<toml::Value>>,
}

/// Loads the manifest at the generator root; a missing manifest is empty.
///
/// # Arguments
/// * `root` - Generator root directory
///
/// # Returns
/// * `Result<Manifest>` - The validated manifest
pub fn load_manifest(root: &Path) -> Result<Manifest> {
    let path = root.join(MANIFEST_FILE);
    match fs::read_to_string(&path) {
        Ok(content) => parse_manifest(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No manifest at '{}'", path.display());
            Ok(Manifest::default())
        }
        Err(e) => Err(Error::IoError(e)),
    }
}

/// Parses and validates manifest text. Any violation fails the whole manifest.
pub fn parse_manifest(content: &str) -> Result<Manifest> {
    let raw: RawManifest = toml::from_str(content)
        .map_err(|e| Error::ManifestError(e.to_string().trim_end().to_string()))?;

    let name_pattern = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .map_err(|e| Error::ManifestError(e.to_string()))?;

    let mut prompts = IndexMap::with_capacity(raw.prompts.len());
    for (name, prompt) in raw.prompts {
        validate_name(&name, &name_pattern)?;
        prompts.insert(name.clone(), build_prompt(&name, prompt)?);
    }

    Ok(Manifest { help: raw.help, ignore: raw.ignore, prompts })
}

fn validate_name(name: &str, pattern: &Regex) -> Result<()> {
    if name.len() > MAX_PROMPT_NAME {
        return Err(Error::ValidationError(format!(
            "prompt name '{name}' is longer than {MAX_PROMPT_NAME} characters"
        )));
    }
    if !pattern.is_match(name) {
        return Err(Error::ValidationError(format!(
            "prompt name '{name}' must start with a letter or '_' and contain only letters, digits and '_'"
        )));
    }
    Ok(())
}

fn build_prompt(name: &str, raw: RawPrompt) -> Result<Prompt> {
    let message = match raw.message {
        Some(message) if !message.trim().is_empty() => message,
        _ => {
            return Err(Error::ValidationError(format!("prompt '{name}' requires a message")))
        }
    };
    if message.chars().count() > MAX_MESSAGE {
        return Err(Error::ValidationError(format!(
            "message of prompt '{name}' is longer than {MAX_MESSAGE} characters"
        )));
    }

    let Some(kind) = raw.kind else {
        return Err(Error::ValidationError(format!("prompt '{name}' requires a type")));
    };
    let kind = match kind.as_str() {
        "input" => PromptKind::Input,
        "integer" => PromptKind::Integer,
        "confirm" => PromptKind::Confirm,
        "choice" => PromptKind::Choice(options(name, raw.options)?),
        "multi-choice" => PromptKind::MultiChoice(options(name, raw.options)?),
        other => {
            return Err(Error::ValidationError(format!(
                "prompt '{name}' has unknown type '{other}'"
            )))
        }
    };

    Ok(Prompt { message, help: raw.help, kind })
}

fn options(name: &str, raw: Option<Vec<toml::Value>>) -> Result<Vec<String>> {
    let raw = raw.unwrap_or_default();
    if raw.is_empty() {
        return Err(Error::ValidationError(format!(
            "prompt '{name}' requires a non-empty list of options"
        )));
    }
    raw.into_iter()
        .map(|option| match option {
            toml::Value::String(s) => Ok(s),
            other => Err(Error::ValidationError(format!(
                "options of prompt '{name}' must be strings, found {}",
                other.type_str()
            ))),
        })
        .collect()
}
