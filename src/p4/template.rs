//! `@{...}` placeholders inside rewrite literals.
//!
//! A placeholder is a `|`-separated chain of alternatives; the first one that
//! yields a non-empty value is used:
//!
//! - `@{name}` looks the name up (numeric names address capture groups first)
//! - `@{&name}` / `@{%name}` look up only the Chapter / TestBounds scope
//! - `@{'text'}` is the text itself
//!
//! Everything outside placeholders passes through unchanged, except that the
//! escaped separator `\->` renders as `->`.

use std::fmt;

use super::variables::{Scope, VariableStore};

const OPEN: &str = "@{";
const ESCAPED_ARROW: &str = r"\->";

/// Looks up placeholder names during rendering.
pub trait Resolver {
    fn resolve(&self, name: &str, scope: Option<Scope>) -> Option<String>;
}

impl<F> Resolver for F
where
    F: Fn(&str, Option<Scope>) -> Option<String>,
{
    fn resolve(&self, name: &str, scope: Option<Scope>) -> Option<String> {
        self(name, scope)
    }
}

/// Resolves against the variable store and the capture groups of the
/// command's own source match.
pub struct StoreResolver<'a> {
    pub store: &'a VariableStore,
    pub groups: &'a [String],
}

impl Resolver for StoreResolver<'_> {
    fn resolve(&self, name: &str, scope: Option<Scope>) -> Option<String> {
        if let Some(scope) = scope {
            return self.store.get(scope, name).map(str::to_string);
        }
        let group = name
            .parse::<usize>()
            .ok()
            .and_then(|i| self.groups.get(i))
            .filter(|v| !v.is_empty());
        group
            .map(String::as_str)
            .or_else(|| self.store.resolve(name))
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alternative {
    Lookup { scope: Option<Scope>, name: String },
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Placeholder(Vec<Alternative>),
}

/// A rewrite literal split into text and placeholders. Renders back to the
/// exact source text via `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateString {
    raw: String,
    segments: Vec<Segment>,
}

impl TemplateString {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = raw;

        while let Some(start) = rest.find(OPEN) {
            let body = &rest[start + OPEN.len()..];
            let Some(end) = placeholder_end(body) else {
                break;
            };
            push_text(&mut segments, &rest[..start]);
            segments.push(Segment::Placeholder(parse_alternatives(&body[..end])));
            rest = &body[end + 1..];
        }
        push_text(&mut segments, rest);

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn render(&self, resolver: &dyn Resolver) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(alternatives) => {
                    if let Some(value) = resolve_first(alternatives, resolver) {
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for TemplateString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Replace every placeholder in `text`.
pub fn de_template(text: &str, resolver: &dyn Resolver) -> String {
    TemplateString::parse(text).render(resolver)
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text.replace(ESCAPED_ARROW, "->")));
    }
}

/// Index of the `}` closing a placeholder body, ignoring braces inside quotes.
fn placeholder_end(body: &str) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in body.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '}' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_alternatives(body: &str) -> Vec<Alternative> {
    split_unquoted(body)
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part.len() >= 2 && part.starts_with('\'') && part.ends_with('\'') {
                Alternative::Literal(part[1..part.len() - 1].replace(ESCAPED_ARROW, "->"))
            } else if let Some(name) = part.strip_prefix('&') {
                Alternative::Lookup {
                    scope: Some(Scope::Chapter),
                    name: name.to_string(),
                }
            } else if let Some(name) = part.strip_prefix('%') {
                Alternative::Lookup {
                    scope: Some(Scope::TestBounds),
                    name: name.to_string(),
                }
            } else {
                Alternative::Lookup {
                    scope: None,
                    name: part.to_string(),
                }
            }
        })
        .collect()
}

fn split_unquoted(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '|' if !quoted => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn resolve_first(alternatives: &[Alternative], resolver: &dyn Resolver) -> Option<String> {
    alternatives.iter().find_map(|alternative| {
        let value = match alternative {
            Alternative::Literal(text) => Some(text.clone()),
            Alternative::Lookup { scope, name } => resolver.resolve(name, *scope),
        };
        value.filter(|v| !v.is_empty())
    })
}
