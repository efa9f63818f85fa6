//! Named template registry

use super::dialect::{table_context, Dialect};
use super::template::Template;
use crate::error::{Error, Result};
use crate::schema::Table;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// A set of parsed templates looked up by logical name.
///
/// Built once, then only read; rendering takes `&self`.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: IndexMap<String, Template>,
}

impl TemplateSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in templates for a destination dialect
    pub fn builtin(dialect: Dialect) -> Result<Self> {
        let mut set = Self::new();
        for (name, source) in dialect.builtin_templates() {
            set.add(*name, source)?;
        }
        Ok(set)
    }

    /// Parse and register a template, replacing any template of the same name
    pub fn add(&mut self, name: impl Into<String>, source: &str) -> Result<&mut Self> {
        let name = name.into();
        let template = Template::parse(name.clone(), source)?;
        self.templates.insert(name, template);
        Ok(self)
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Registered template names in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    /// Render a named template to bytes
    pub fn render(&self, name: &str, context: &Value) -> Result<Vec<u8>> {
        self.render_string(name, context).map(String::into_bytes)
    }

    /// Render a named template to a string
    pub fn render_string(&self, name: &str, context: &Value) -> Result<String> {
        let template = self.get(name).ok_or_else(|| Error::UnknownTemplate {
            name: name.to_string(),
        })?;
        let rendered = template.render(context)?;
        debug!(template = name, bytes = rendered.len(), "rendered template");
        Ok(rendered)
    }

    /// Render a named template for one table
    pub fn render_table(&self, name: &str, table: &Table, dialect: Dialect) -> Result<String> {
        self.render_string(name, &table_context(table, dialect))
    }
}
