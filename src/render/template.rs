//! Template parsing and rendering
//!
//! Syntax:
//! - `{{ table.name }}` substitutes a value (dotted path)
//! - `{{#each path}}...{{/each}}` iterates an array, or an object in key order
//! - `{{#sep}}...{{/sep}}` inside `each` is emitted between items
//! - `{{#if path}}...{{else}}...{{/if}}` branches on truthiness
//! - `this`, `@index`, `@key`, `@first`, `@last` refer to the current item

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::LazyLock;

/// Regex for matching any tag: {{ ... }}
static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("valid tag regex"));

/// Regex for variable paths: name(.name)*, this, @index ...
static PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(@[a-z]+|[a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)$")
        .expect("valid path regex")
});

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    Each { path: String, body: Vec<Node> },
    If {
        path: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Sep(Vec<Node>),
}

#[derive(Debug)]
enum Frame {
    Each(String),
    If(String, Option<Vec<Node>>),
    Sep,
}

/// A parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

/// One level of the scope stack
#[derive(Clone, Copy)]
struct Scope<'a> {
    value: &'a Value,
    index: Option<usize>,
    key: Option<&'a str>,
    last: bool,
}

impl Template {
    /// Parse a template source. Errors name the template.
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self> {
        let name = name.into();
        let mut stack: Vec<(Frame, Vec<Node>)> = Vec::new();
        let mut current: Vec<Node> = Vec::new();
        let mut cursor = 0;

        for cap in TAG_REGEX.captures_iter(source) {
            let whole = cap.get(0).expect("match 0 always exists");
            let inner = cap.get(1).map_or("", |m| m.as_str());

            if whole.start() > cursor {
                current.push(Node::Text(source[cursor..whole.start()].to_string()));
            }
            cursor = whole.end();

            if let Some(path) = inner.strip_prefix("#each") {
                let path = parse_path(&name, path.trim())?;
                stack.push((Frame::Each(path), std::mem::take(&mut current)));
            } else if let Some(path) = inner.strip_prefix("#if") {
                let path = parse_path(&name, path.trim())?;
                stack.push((Frame::If(path, None), std::mem::take(&mut current)));
            } else if inner == "#sep" {
                if !stack.iter().any(|(f, _)| matches!(f, Frame::Each(_))) {
                    return Err(Error::template(&name, "{{#sep}} outside of {{#each}}"));
                }
                stack.push((Frame::Sep, std::mem::take(&mut current)));
            } else if inner == "else" {
                match stack.last_mut() {
                    Some((Frame::If(_, then @ None), _)) => {
                        *then = Some(std::mem::take(&mut current));
                    }
                    _ => return Err(Error::template(&name, "{{else}} outside of {{#if}}")),
                }
            } else if let Some(closing) = inner.strip_prefix('/') {
                let (frame, parent) = stack.pop().ok_or_else(|| {
                    Error::template(&name, format!("unexpected {{{{/{closing}}}}}"))
                })?;
                let body = std::mem::replace(&mut current, parent);
                let node = match (frame, closing.trim()) {
                    (Frame::Each(path), "each") => Node::Each { path, body },
                    (Frame::If(path, None), "if") => Node::If {
                        path,
                        then: body,
                        otherwise: Vec::new(),
                    },
                    (Frame::If(path, Some(then)), "if") => Node::If {
                        path,
                        then,
                        otherwise: body,
                    },
                    (Frame::Sep, "sep") => Node::Sep(body),
                    (frame, other) => {
                        return Err(Error::template(
                            &name,
                            format!("{{{{/{other}}}}} does not close {frame:?}"),
                        ))
                    }
                };
                current.push(node);
            } else {
                current.push(Node::Var(parse_path(&name, inner)?));
            }
        }

        if let Some((frame, _)) = stack.last() {
            return Err(Error::template(&name, format!("unclosed block {frame:?}")));
        }
        if cursor < source.len() {
            current.push(Node::Text(source[cursor..].to_string()));
        }

        Ok(Self {
            name,
            nodes: current,
        })
    }

    /// Template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render against a context. Fails on the first undefined reference.
    pub fn render(&self, context: &Value) -> Result<String> {
        let mut out = String::new();
        let root = Scope {
            value: context,
            index: None,
            key: None,
            last: true,
        };
        self.render_nodes(&self.nodes, &mut vec![root], &mut out)?;
        Ok(out)
    }

    fn render_nodes<'c>(
        &self,
        nodes: &[Node],
        scopes: &mut Vec<Scope<'c>>,
        out: &mut String,
    ) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Var(path) => {
                    let value = lookup(scopes, path)
                        .ok_or_else(|| Error::missing_field(&self.name, path))?;
                    out.push_str(&value_to_string(&value));
                }
                Node::Each { path, body } => {
                    let value = lookup_ref(scopes, path)
                        .ok_or_else(|| Error::missing_field(&self.name, path))?;
                    match value {
                        Value::Array(items) => {
                            for (i, item) in items.iter().enumerate() {
                                scopes.push(Scope {
                                    value: item,
                                    index: Some(i),
                                    key: None,
                                    last: i + 1 == items.len(),
                                });
                                let result = self.render_nodes(body, scopes, out);
                                scopes.pop();
                                result?;
                            }
                        }
                        Value::Object(map) => {
                            let mut keys: Vec<&String> = map.keys().collect();
                            keys.sort();
                            let count = keys.len();
                            for (i, key) in keys.into_iter().enumerate() {
                                scopes.push(Scope {
                                    value: &map[key],
                                    index: Some(i),
                                    key: Some(key.as_str()),
                                    last: i + 1 == count,
                                });
                                let result = self.render_nodes(body, scopes, out);
                                scopes.pop();
                                result?;
                            }
                        }
                        Value::Null => {}
                        other => {
                            return Err(Error::template(
                                &self.name,
                                format!("cannot iterate over '{path}' ({other})"),
                            ))
                        }
                    }
                }
                Node::If {
                    path,
                    then,
                    otherwise,
                } => {
                    let truthy = lookup(scopes, path).is_some_and(|v| is_truthy(&v));
                    let branch = if truthy { then } else { otherwise };
                    self.render_nodes(branch, scopes, out)?;
                }
                Node::Sep(body) => {
                    let last = scopes
                        .iter()
                        .rev()
                        .find(|s| s.index.is_some())
                        .map_or(true, |s| s.last);
                    if !last {
                        self.render_nodes(body, scopes, out)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse_path(template: &str, path: &str) -> Result<String> {
    if PATH_REGEX.is_match(path) {
        Ok(path.to_string())
    } else {
        Err(Error::template(template, format!("invalid expression '{path}'")))
    }
}

/// Resolve a path to a borrowed value (no `@` variables)
fn lookup_ref<'a>(scopes: &[Scope<'a>], path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;

    if first == "this" {
        let top = scopes.last()?;
        return walk(top.value, parts);
    }

    scopes.iter().rev().find_map(|scope| match scope.value {
        Value::Object(map) => map.get(first).and_then(|v| walk(v, parts.clone())),
        _ => None,
    })
}

/// Resolve a path, including the `@` loop variables
fn lookup(scopes: &[Scope<'_>], path: &str) -> Option<Value> {
    if let Some(var) = path.strip_prefix('@') {
        let scope = scopes.iter().rev().find(|s| s.index.is_some())?;
        return match var {
            "index" => scope.index.map(Value::from),
            "key" => scope.key.map(Value::from),
            "first" => Some(Value::Bool(scope.index == Some(0))),
            "last" => Some(Value::Bool(scope.last)),
            _ => None,
        };
    }
    lookup_ref(scopes, path).cloned()
}

fn walk<'a, 'p>(value: &'a Value, parts: impl Iterator<Item = &'p str>) -> Option<&'a Value> {
    let mut current = value;
    for part in parts {
        match current {
            Value::Object(map) => current = map.get(part)?,
            _ => return None,
        }
    }
    Some(current)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => canonical_json(value),
    }
}

/// Serialize JSON with object keys in lexicographic order
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}:", Value::String(key.clone()));
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

/// Check if a string contains template tags
pub fn has_templates(s: &str) -> bool {
    TAG_REGEX.is_match(s)
}

/// Render a one-off template string
pub fn render_str(name: &str, source: &str, context: &Value) -> Result<String> {
    Template::parse(name, source)?.render(context)
}
