//! Blueprint assembly: turns the tags of one source file into its output.
//!
//! Tags are processed in document order against an isolated copy of the
//! run's base context, so a `variable` or `partial` tag only affects the tags
//! after it, and never another file.

pub mod context;
pub mod markup;

use log::debug;
use std::collections::HashMap;

use crate::error::{Error, ParseError, ParseErrorKind};
use crate::renderer::TemplateRenderer;
use crate::script::{self, BodyMode, Value};

pub use context::Context;
pub use markup::{Body, Tag, TagName};

/// The result of processing one blueprint file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blueprint {
    /// Rendered `template` body.
    pub body: String,
    /// Output path override; empty when unset.
    pub filename: String,
    /// Whether the file must not be generated.
    pub skip: bool,
}

/// What to do with a `variable` or `partial` tag without a `name` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingNamePolicy {
    #[default]
    Skip,
    Error,
}

/// How repeated `filename`, `skipif` and `template` tags are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicateTagPolicy {
    #[default]
    LastWins,
    FirstWins,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlueprintOptions {
    pub missing_name: MissingNamePolicy,
    pub duplicates: DuplicateTagPolicy,
}

/// Parses and assembles blueprint files.
pub struct BlueprintParser<'a> {
    renderer: &'a dyn TemplateRenderer,
    options: BlueprintOptions,
}

impl<'a> BlueprintParser<'a> {
    pub fn new(renderer: &'a dyn TemplateRenderer) -> Self {
        Self { renderer, options: BlueprintOptions::default() }
    }

    pub fn with_options(mut self, options: BlueprintOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> BlueprintOptions {
        self.options
    }

    /// Parses the raw bytes of a blueprint file and assembles its tags.
    ///
    /// # Arguments
    /// * `source` - File contents
    /// * `base` - Context shared by every file of the run; never modified
    ///
    /// # Returns
    /// * `Result<Blueprint, ParseError>` - The blueprint, or the first failure
    pub fn parse(&self, source: &[u8], base: &Context) -> Result<Blueprint, ParseError> {
        let tags = markup::parse(source, self.options.missing_name)?;
        self.assemble(&tags, base)
    }

    /// Runs the tags in order against a private copy of `base`.
    pub fn assemble(&self, tags: &[Tag], base: &Context) -> Result<Blueprint, ParseError> {
        let mut context = base.clone();
        let mut blueprint = Blueprint::default();
        let mut declared: HashMap<TagName, usize> = HashMap::new();

        for tag in tags {
            if matches!(tag.name, TagName::Filename | TagName::Skipif | TagName::Template) {
                if let Some(first) = declared.get(&tag.name) {
                    match self.options.duplicates {
                        DuplicateTagPolicy::LastWins => {}
                        DuplicateTagPolicy::FirstWins => {
                            debug!("Ignoring repeated '{}' tag on line {}", tag.name, tag.line);
                            continue;
                        }
                        DuplicateTagPolicy::Error => {
                            return Err(ParseError::new(
                                ParseErrorKind::Syntax,
                                tag.name.as_str(),
                                tag.line,
                                format!("duplicate tag, first declared on line {first}"),
                            ));
                        }
                    }
                }
                declared.entry(tag.name).or_insert(tag.line);
            }

            match tag.name {
                TagName::Variable => {
                    let (Some(body), Some(name)) = (&tag.body, tag.attribute("name")) else {
                        continue;
                    };
                    let value = evaluate(tag, body, &context)?;
                    context.set_var(name, value);
                }
                TagName::Partial => {
                    let (Some(body), Some(name)) = (&tag.body, tag.attribute("name")) else {
                        continue;
                    };
                    context.set_partial(name, body.content.clone());
                }
                TagName::Filename => {
                    blueprint.filename = match &tag.body {
                        None => String::new(),
                        Some(body) => match evaluate(tag, body, &context)? {
                            Value::String(s) => s,
                            Value::None => String::new(),
                            other => {
                                return Err(ParseError::new(
                                    ParseErrorKind::Type,
                                    tag.name.as_str(),
                                    tag.line,
                                    format!(
                                        "filename must be a string or None, got {}",
                                        other.type_name()
                                    ),
                                ))
                            }
                        },
                    };
                }
                TagName::Skipif => {
                    blueprint.skip = match &tag.body {
                        None => false,
                        Some(body) => evaluate(tag, body, &context)?.truth(),
                    };
                }
                TagName::Template => {
                    blueprint.body = match &tag.body {
                        None => String::new(),
                        Some(body) => self.render(tag, body, &context)?,
                    };
                }
            }
        }

        Ok(blueprint)
    }

    fn render(&self, tag: &Tag, body: &Body, context: &Context) -> Result<String, ParseError> {
        self.renderer.render(&body.content, context.partials(), &context.to_data()).map_err(|e| {
            let msg = match e {
                Error::RenderError(msg) => msg,
                other => other.to_string(),
            };
            let (local, msg) = split_line_prefix(&msg);
            ParseError::new(ParseErrorKind::Render, tag.name.as_str(), absolute_line(tag, local), msg)
        })
    }
}

fn evaluate(tag: &Tag, body: &Body, context: &Context) -> Result<Value, ParseError> {
    let mode = if body.inline { BodyMode::Inline } else { BodyMode::Block };
    script::execute(&body.content, mode, &context.vars_value()).map_err(|e| {
        ParseError::new(ParseErrorKind::Eval, tag.name.as_str(), absolute_line(tag, e.line), e.msg)
    })
}

/// Splits a `line N: message` prefix; messages without one are at line 0.
fn split_line_prefix(msg: &str) -> (usize, &str) {
    msg.strip_prefix("line ")
        .and_then(|rest| rest.split_once(": "))
        .and_then(|(n, rest)| n.parse().ok().map(|n| (n, rest)))
        .unwrap_or((0, msg))
}

/// Maps a line local to a tag body onto the source file.
///
/// Inline bodies live on the tag line, so every local line maps there. Block
/// bodies start on the line after the tag, and local lines are 1-based, so
/// local line `L` is `tag.line + L`. Local line 0 means "unknown" and maps to
/// the tag itself.
pub fn absolute_line(tag: &Tag, local: usize) -> usize {
    match &tag.body {
        Some(body) if !body.inline => tag.line + local,
        _ => tag.line,
    }
}
