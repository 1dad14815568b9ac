//! A set of parsed templates sharing one helper table
//!
//! Every template of a blueprint is registered here before anything is
//! rendered, so templates can include each other as partials.

use super::helpers;
use crate::error::{Error, Result};
use handlebars::Handlebars;
use serde_json::Value;

/// Owns all parsed templates of one render run plus the bound helper catalog
pub struct TemplateSet {
    hbs: Handlebars<'static>,
}

impl TemplateSet {
    /// Create an empty set
    ///
    /// With `strict` enabled, referencing a key missing from the context is a
    /// render error instead of an empty substitution.
    pub fn new(strict: bool) -> Self {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(strict);
        // Output is source code, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        helpers::register(&mut hbs);
        Self { hbs }
    }

    /// Parse `source` and register it under `name`
    pub fn add(&mut self, name: &str, source: &str) -> Result<()> {
        self.hbs
            .register_template_string(name, source)
            .map_err(|e| Error::format(format!("template {}", name), e))
    }

    /// Register `source` as a partial under `alias` unless that name is already taken
    pub fn add_alias(&mut self, alias: &str, source: &str) -> Result<bool> {
        if alias.is_empty() || self.contains(alias) {
            return Ok(false);
        }
        self.hbs
            .register_partial(alias, source)
            .map_err(|e| Error::format(format!("template {}", alias), e))?;
        Ok(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hbs.has_template(name)
    }

    /// Render a registered template
    pub fn render(&self, name: &str, ctx: &Value) -> Result<String> {
        self.hbs
            .render(name, ctx)
            .map_err(|e| Error::format(format!("template {}", name), e))
    }

    /// Render an ad-hoc template string with the same helpers and partials
    ///
    /// `label` names the template in errors. Strings without `{{` are returned unchanged.
    pub fn render_str(&self, label: &str, source: &str, ctx: &Value) -> Result<String> {
        if !source.contains("{{") {
            return Ok(source.to_string());
        }
        self.hbs
            .render_template(source, ctx)
            .map_err(|e| Error::format(label.to_string(), e))
    }

    /// Check that `source` parses as a template without registering it
    pub fn validate(source: &str) -> Result<()> {
        handlebars::Template::compile(source)
            .map(|_| ())
            .map_err(|e| Error::format("template", e))
    }
}
