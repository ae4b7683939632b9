//! Rendering SQL step templates.

use crate::checksum::compute_checksum;
use crate::error::SqlResult;
use crate::validate::validate_query;
use dw_core::{Layers, RunMode};
use minijinja::value::Value;
use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior};
use std::collections::HashMap;

/// Values exposed to every template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub layers: &'a Layers,
    pub source_system: &'a str,
    pub run_mode: RunMode,
    pub vars: &'a HashMap<String, serde_yaml::Value>,
}

/// Rendered, validated SQL ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSql {
    pub name: String,
    pub sql: String,
    pub checksum: String,
}

/// Template environment for transform and summary SQL.
///
/// Globals: `layers` (e.g. `{{ layers.extract }}`), `source_system` and
/// `run_mode`. The `var(name, default?)` function reads project vars.
/// Undefined names fail the render instead of rendering empty.
pub struct SqlRenderer<'a> {
    env: Environment<'a>,
}

impl<'a> SqlRenderer<'a> {
    pub fn new(context: &TemplateContext<'_>) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_global("layers", Value::from_serialize(context.layers));
        env.add_global("source_system", Value::from(context.source_system.to_string()));
        env.add_global("run_mode", Value::from(context.run_mode.as_str()));
        env.add_function("var", make_var_fn(context.vars.clone()));
        Self { env }
    }

    /// Render a template; `name` identifies it in error messages.
    pub fn render(&self, name: &str, template: &str) -> SqlResult<String> {
        let rendered = self.env.render_named_str(name, template, ())?;
        Ok(rendered.trim().trim_end_matches(';').trim_end().to_string())
    }

    /// Render, require a single query, and fingerprint the result.
    pub fn prepare(&self, name: &str, template: &str) -> SqlResult<PreparedSql> {
        let sql = self.render(name, template)?;
        validate_query(name, &sql)?;
        let checksum = compute_checksum(&sql);
        log::trace!("Prepared {name} ({checksum})");
        Ok(PreparedSql {
            name: name.to_string(),
            sql,
            checksum,
        })
    }
}

/// `var('name')` or `var('name', default)`
fn make_var_fn(
    vars: HashMap<String, serde_yaml::Value>,
) -> impl Fn(&str, Option<Value>) -> Result<Value, Error> + Send + Sync + Clone + 'static {
    move |name: &str, default: Option<Value>| match (vars.get(name), default) {
        (Some(value), _) => Ok(Value::from_serialize(value)),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(Error::new(
            ErrorKind::UndefinedError,
            format!("Variable '{name}' is not defined and no default provided"),
        )),
    }
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
