//! Template rendering module
//!
//! Renders destination query text (DDL/DML) from named templates and a JSON
//! context, and verifies rendered bytes against golden reference files.
//!
//! # Overview
//!
//! - [`Template`] - parsed template with substitutions, loops and branches
//! - [`TemplateSet`] - templates looked up by logical name
//! - [`Dialect`] - destination type mapping and built-in templates
//! - [`verify_golden`] - byte-exact comparison with a reference file
//!
//! Rendering is a pure function of template and context: object keys are
//! always visited in lexicographic order.

mod dialect;
mod golden;
mod registry;
mod template;

pub use dialect::{table_context, Dialect};
pub use golden::{verify_golden, GoldenDir};
pub use registry::TemplateSet;
pub use template::{canonical_json, has_templates, render_str, Template};
