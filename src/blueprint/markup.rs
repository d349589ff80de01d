//! Line-oriented tag markup of blueprint files.
//!
//! ```text
//! variable -name="greeting" << "Hello, " + vars["name"] >>
//! template <<
//! {{greeting}}!
//! >>
//! ```

use indexmap::IndexMap;
use log::debug;
use std::fmt;
use std::str::FromStr;

use super::MissingNamePolicy;
use crate::error::{ParseError, ParseErrorKind};

const OPEN: &str = "<<";
const CLOSE: &str = ">>";

/// Label used for syntax errors found before a tag name is known.
const MARKUP: &str = "markup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagName {
    Filename,
    Skipif,
    Template,
    Partial,
    Variable,
}

impl TagName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagName::Filename => "filename",
            TagName::Skipif => "skipif",
            TagName::Template => "template",
            TagName::Partial => "partial",
            TagName::Variable => "variable",
        }
    }

    /// Whether the tag must carry a `name` attribute.
    pub fn requires_name(&self) -> bool {
        matches!(self, TagName::Partial | TagName::Variable)
    }
}

impl FromStr for TagName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filename" => Ok(TagName::Filename),
            "skipif" => Ok(TagName::Skipif),
            "template" => Ok(TagName::Template),
            "partial" => Ok(TagName::Partial),
            "variable" => Ok(TagName::Variable),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub content: String,
    /// Written as `<< ... >>` on the tag line.
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: TagName,
    pub attributes: IndexMap<String, String>,
    /// `None` when the delimiter is absent or the content is whitespace only.
    pub body: Option<Body>,
    /// 1-based line of the tag declaration.
    pub line: usize,
}

impl Tag {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Parses the raw bytes of a blueprint file into its tags, in document order.
///
/// # Arguments
/// * `source` - File contents
/// * `missing_name` - What to do with a `variable` or `partial` tag lacking `name`
///
/// # Returns
/// * `Result<Vec<Tag>, ParseError>` - Tags, or the first syntax error
pub fn parse(source: &[u8], missing_name: MissingNamePolicy) -> Result<Vec<Tag>, ParseError> {
    let text = std::str::from_utf8(source).map_err(|e| {
        let line = source[..e.valid_up_to()].iter().filter(|b| **b == b'\n').count() + 1;
        syntax(MARKUP, line, "file is not valid UTF-8")
    })?;

    let lines: Vec<&str> = text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).collect();
    let mut tags = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let line_no = idx + 1;
        let line = lines[idx];
        idx += 1;
        if line.trim().is_empty() {
            continue;
        }

        let head = parse_head(line, line_no)?;
        let label = head.name;
        let body = match head.rest {
            None => None,
            Some(rest) => match rest.find(CLOSE) {
                Some(end) => {
                    ensure_trailing_blank(&rest[end + CLOSE.len()..], label, line_no)?;
                    Some(Body { content: rest[..end].trim().to_string(), inline: true })
                }
                None if rest.trim().is_empty() => {
                    let (content, next) = read_block(&lines, idx, label, line_no)?;
                    idx = next;
                    Some(Body { content, inline: false })
                }
                None => {
                    return Err(syntax(
                        label,
                        line_no,
                        "inline body must be closed with '>>' on the same line",
                    ))
                }
            },
        };

        let Ok(name) = label.parse::<TagName>() else {
            debug!("Ignoring unknown tag '{label}' on line {line_no}");
            continue;
        };

        if name.requires_name() && !head.attributes.contains_key("name") {
            match missing_name {
                MissingNamePolicy::Skip => {
                    debug!("Skipping '{name}' tag without a name on line {line_no}");
                    continue;
                }
                MissingNamePolicy::Error => {
                    return Err(syntax(label, line_no, "missing required attribute 'name'"));
                }
            }
        }

        let body = body.filter(|b| !b.content.trim().is_empty());
        tags.push(Tag { name, attributes: head.attributes, body, line: line_no });
    }

    Ok(tags)
}

struct Head<'a> {
    name: &'a str,
    attributes: IndexMap<String, String>,
    /// Text after `<<`, if the line has a body delimiter.
    rest: Option<&'a str>,
}

fn parse_head(line: &str, line_no: usize) -> Result<Head<'_>, ParseError> {
    let trimmed = line.trim_start();
    let name_len = identifier_len(trimmed);
    if name_len == 0 {
        return Err(syntax(MARKUP, line_no, "expected a tag name"));
    }
    let name = &trimmed[..name_len];
    let mut rest = &trimmed[name_len..];
    let mut attributes = IndexMap::new();

    loop {
        let stripped = rest.trim_start();
        if stripped.is_empty() {
            return Ok(Head { name, attributes, rest: None });
        }
        if let Some(after) = stripped.strip_prefix(OPEN) {
            return Ok(Head { name, attributes, rest: Some(after) });
        }
        if stripped.len() == rest.len() {
            return Err(syntax(name, line_no, "expected whitespace after tag name"));
        }
        let Some(after_dash) = stripped.strip_prefix('-') else {
            let found = stripped.chars().next().unwrap_or(' ');
            return Err(syntax(
                name,
                line_no,
                format!("unexpected '{found}', expected an attribute or '<<'"),
            ));
        };
        let (attr, value, remaining) = parse_attribute(after_dash, name, line_no)?;
        // Repeated attributes keep the last value.
        attributes.insert(attr.to_string(), value);
        rest = remaining;
    }
}

/// Parses `name="value"` following the leading `-`.
fn parse_attribute<'a>(
    input: &'a str,
    tag: &str,
    line_no: usize,
) -> Result<(&'a str, String, &'a str), ParseError> {
    let len = identifier_len(input);
    if len == 0 {
        return Err(syntax(tag, line_no, "expected an attribute name after '-'"));
    }
    let attr = &input[..len];
    let Some(after_eq) = input[len..].strip_prefix('=') else {
        return Err(syntax(tag, line_no, format!("expected '=' after attribute '{attr}'")));
    };
    let Some(quoted) = after_eq.strip_prefix('"') else {
        return Err(syntax(tag, line_no, format!("value of attribute '{attr}' must be quoted")));
    };

    let mut value = String::new();
    let mut chars = quoted.char_indices();
    while let Some((pos, c)) = chars.next() {
        match c {
            '"' => return Ok((attr, value, &quoted[pos + 1..])),
            '\\' => match chars.next() {
                Some((_, escaped @ ('"' | '\\'))) => value.push(escaped),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            other => value.push(other),
        }
    }
    Err(syntax(tag, line_no, format!("unterminated value of attribute '{attr}'")))
}

/// Collects the lines of a block body starting at `start`, returning the
/// content and the index of the line after the closing delimiter.
fn read_block(
    lines: &[&str],
    start: usize,
    tag: &str,
    line_no: usize,
) -> Result<(String, usize), ParseError> {
    let mut content = String::new();
    for (idx, line) in lines.iter().enumerate().skip(start) {
        if let Some(end) = line.find(CLOSE) {
            ensure_trailing_blank(&line[end + CLOSE.len()..], tag, idx + 1)?;
            let last = &line[..end];
            if !last.trim().is_empty() {
                content.push_str(last);
            }
            return Ok((content, idx + 1));
        }
        content.push_str(line);
        content.push('\n');
    }
    Err(syntax(tag, line_no, "unterminated block body, expected '>>'"))
}

fn ensure_trailing_blank(rest: &str, tag: &str, line_no: usize) -> Result<(), ParseError> {
    if rest.trim().is_empty() {
        Ok(())
    } else {
        Err(syntax(tag, line_no, "unexpected text after '>>'"))
    }
}

fn identifier_len(s: &str) -> usize {
    let mut len = 0;
    for (i, c) in s.char_indices() {
        let valid = if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_' || c == '-'
        };
        if !valid {
            break;
        }
        len = i + c.len_utf8();
    }
    len
}

fn syntax(tag: &str, line: usize, msg: impl Into<String>) -> ParseError {
    ParseError::new(ParseErrorKind::Syntax, tag, line, msg)
}
