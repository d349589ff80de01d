//! Handlebars-backed rendering of `template` bodies.
//!
//! Mustache-style sections (`{{#name}}...{{else}}...{{/name}}`) go through a
//! `blockHelperMissing` hook: lists render once per element, objects once with
//! the object as context, other truthy values once in the enclosing scope.
//! `{{.}}` is accepted for `{{this}}`. Output is never HTML-escaped.
//!
//! Before rendering, each template is scanned for its block structure and
//! partial references so that the errors the blueprint layer re-maps carry a
//! line local to the template.

use handlebars::{
    no_escape, BlockContext, Context, Handlebars, Helper, HelperDef, HelperResult, Output,
    RenderContext, RenderError, Renderable, Template, TemplateError,
};
use regex::Regex;
use std::collections::HashMap;
use std::error::Error as StdError;

use super::TemplateRenderer;
use crate::error::{Error, Result};

const BLOCK_HELPER_MISSING: &str = "blockHelperMissing";
const MAX_SECTION_DEPTH: usize = 64;
const MAX_PARTIAL_DEPTH: usize = 32;

/// A `{{.}}` tag, keeping braces and whitespace control.
const DOT_TAG: &str = r"\{\{(\{?~?)\s*\.\s*(~?\}?)\}\}";
const DOT_AS_THIS: &str = "{{${1}this${2}}}";

#[derive(Debug)]
struct Failure {
    line: usize,
    msg: String,
}

impl Failure {
    fn new(line: usize, msg: impl Into<String>) -> Self {
        Self { line, msg: msg.into() }
    }
}

impl From<Failure> for Error {
    fn from(f: Failure) -> Self {
        Error::RenderError(format!("line {}: {}", f.line, f.msg))
    }
}

/// Template rendering engine built on `handlebars`.
#[derive(Clone)]
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        // Generated files are source code, not HTML.
        registry.register_escape_fn(no_escape);
        registry.register_helper(BLOCK_HELPER_MISSING, Box::new(SectionHelper));
        Self { registry }
    }
}

impl Default for HandlebarsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(
        &self,
        template: &str,
        partials: &HashMap<String, String>,
        data: &serde_json::Value,
    ) -> Result<String> {
        let dot = Regex::new(DOT_TAG).map_err(|e| Error::RenderError(e.to_string()))?;
        let template = dot.replace_all(template, DOT_AS_THIS);

        let mut check = PartialCheck::new(partials);
        for (name, line) in scan(&template)? {
            check.height(&name).map_err(|msg| Failure::new(line, msg))?;
        }
        Template::compile(&template).map_err(|e| template_failure(&e))?;

        let mut registry = self.registry.clone();
        for name in check.heights.keys() {
            if let Some(text) = partials.get(*name) {
                registry.register_partial(name, dot.replace_all(text, DOT_AS_THIS)).map_err(|e| {
                    Error::RenderError(format!("in partial '{name}': {}", e.reason))
                })?;
            }
        }
        registry.render_template(&template, data).map_err(|e| render_failure(&e))
    }
}

fn template_failure(e: &TemplateError) -> Error {
    Failure::new(e.line_no.unwrap_or(1), e.reason.to_string()).into()
}

fn render_failure(e: &RenderError) -> Error {
    if let Some(inner) = e.source().and_then(|s| s.downcast_ref::<TemplateError>()) {
        return template_failure(inner);
    }
    match (&e.template_name, e.line_no) {
        (Some(partial), _) => Error::RenderError(format!("in partial '{partial}': {}", e.desc)),
        (None, Some(line)) => Failure::new(line, e.desc.clone()).into(),
        (None, None) => Error::RenderError(e.desc.clone()),
    }
}

/// Renders a section for a block whose name is not a helper.
struct SectionHelper;

impl HelperDef for SectionHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'reg, 'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = rc.evaluate(ctx, h.name())?.as_json().clone();
        if is_falsy(&value) {
            return match h.inverse() {
                Some(inverse) => inverse.render(r, ctx, rc, out),
                None => Ok(()),
            };
        }
        let Some(template) = h.template() else {
            return Ok(());
        };
        let frames = match value {
            serde_json::Value::Array(items) => items,
            object @ serde_json::Value::Object(_) => vec![object],
            _ => return template.render(r, ctx, rc, out),
        };
        for frame in frames {
            let mut block = BlockContext::new();
            block.set_base_value(frame);
            rc.push_block(block);
            let result = template.render(r, ctx, rc, out);
            rc.pop_block();
            result?;
        }
        Ok(())
    }
}

fn is_falsy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Checks block structure and returns the partial references of `source`
/// with their lines.
fn scan(source: &str) -> std::result::Result<Vec<(String, usize)>, Failure> {
    let mut open: Vec<(&str, usize)> = Vec::new();
    let mut references = Vec::new();
    let mut pos = 0;

    while let Some(found) = source[pos..].find("{{") {
        let start = pos + found;
        let line = line_at(source, start);
        let rest = &source[start..];
        let (close, skip) = if rest.starts_with("{{!--") {
            ("--}}", 5)
        } else if rest.starts_with("{{{") {
            ("}}}", 3)
        } else {
            ("}}", 2)
        };
        let end = rest[skip..]
            .find(close)
            .ok_or_else(|| Failure::new(line, format!("unclosed tag, expected '{close}'")))?;
        pos = start + skip + end + close.len();
        if skip != 2 {
            continue;
        }

        let inner = rest[2..2 + end].trim_matches(|c: char| c == '~' || c.is_whitespace());
        let mut chars = inner.chars();
        let sigil = chars.next();
        let name = chars.as_str().split_whitespace().next().unwrap_or_default();
        match sigil {
            Some('#') => {
                open.push((name, line));
                if open.len() > MAX_SECTION_DEPTH {
                    return Err(Failure::new(
                        line,
                        format!("sections nested deeper than {MAX_SECTION_DEPTH} levels"),
                    ));
                }
            }
            Some('/') => {
                let Some((section, _)) = open.pop() else {
                    return Err(Failure::new(line, format!("unexpected closing tag '{name}'")));
                };
                if section != name {
                    return Err(Failure::new(
                        line,
                        format!("closing tag '{name}' does not match section '{section}'"),
                    ));
                }
            }
            // Dynamic partial names are resolved by handlebars itself.
            Some('>') if !name.is_empty() && !name.starts_with('(') => {
                references.push((name.to_string(), line));
            }
            _ => {}
        }
    }

    if let Some((section, line)) = open.pop() {
        return Err(Failure::new(line, format!("unclosed section '{section}'")));
    }
    Ok(references)
}

/// Resolves partial references, bounding how deep partials include each other.
struct PartialCheck<'a> {
    partials: &'a HashMap<String, String>,
    heights: HashMap<&'a str, usize>,
    visiting: Vec<&'a str>,
}

impl<'a> PartialCheck<'a> {
    fn new(partials: &'a HashMap<String, String>) -> Self {
        Self { partials, heights: HashMap::new(), visiting: Vec::new() }
    }

    fn height(&mut self, name: &str) -> std::result::Result<usize, String> {
        if let Some(height) = self.heights.get(name) {
            return Ok(*height);
        }
        let Some((name, text)) = self.partials.get_key_value(name) else {
            return Err(format!("undefined partial '{name}'"));
        };
        let name = name.as_str();
        if self.visiting.contains(&name) || self.visiting.len() >= MAX_PARTIAL_DEPTH {
            return Err(format!("partial '{name}' nested deeper than {MAX_PARTIAL_DEPTH} levels"));
        }

        self.visiting.push(name);
        let result = self.children_height(name, text);
        self.visiting.pop();

        let height = result? + 1;
        if height > MAX_PARTIAL_DEPTH {
            return Err(format!("partial '{name}' nested deeper than {MAX_PARTIAL_DEPTH} levels"));
        }
        self.heights.insert(name, height);
        Ok(height)
    }

    fn children_height(&mut self, name: &str, text: &str) -> std::result::Result<usize, String> {
        let nested = |msg: String| format!("in partial '{name}': {msg}");
        let references =
            scan(text).map_err(|f| nested(format!("line {}: {}", f.line, f.msg)))?;
        let mut height = 0;
        for (child, _) in references {
            height = height.max(self.height(&child).map_err(nested)?);
        }
        Ok(height)
    }
}
