//! Output templates that reshape an extracted value into a target JSON shape.
//!
//! Templates are minijinja sources rendered in strict-undefined mode, so a
//! reference to a missing field is a render error rather than blank text.
//! Object keys of the extracted value are top-level template variables:
//!
//! ```text
//! {"title": {{ heading | tojson }}, "author": {{ details.author | tojson }}}
//! ```

use crate::error::{BoxError, TemplateError};
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde_json::Value;
use std::path::Path;

const TEMPLATE_NAME: &str = "output";

/// Built-in template producing `{"heading", "summary"}` objects.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = include_str!("../../templates/output.json.j2");

/// Renders a decoded JSON value to text.
///
/// Implementations must fail on missing or invalid references instead of
/// emitting blank output.
pub trait RenderTemplate {
    fn render(&self, context: &Value) -> Result<String, BoxError>;
}

/// A compiled minijinja output template.
pub struct OutputTemplate {
    env: Environment<'static>,
}

impl OutputTemplate {
    /// Compile `source`. Syntax errors are reported here, not at render time.
    pub fn new(source: impl Into<String>) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.add_filter("tojson", strict_tojson);
        env.add_template_owned(TEMPLATE_NAME, source.into())?;
        Ok(Self { env })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::new(source)
    }

    pub fn default_output() -> Result<Self, TemplateError> {
        Self::new(DEFAULT_OUTPUT_TEMPLATE)
    }
}

/// `tojson` that fails on undefined input. Strict mode alone lets filters
/// receive undefined values, which the built-in filter renders as `null`.
fn strict_tojson(value: minijinja::Value) -> Result<minijinja::Value, minijinja::Error> {
    if value.is_undefined() {
        return Err(minijinja::Error::new(
            ErrorKind::UndefinedError,
            "tojson applied to an undefined value",
        ));
    }
    let json = serde_json::to_string(&value).map_err(|e| {
        minijinja::Error::new(ErrorKind::BadSerialization, "cannot serialize to JSON")
            .with_source(e)
    })?;
    Ok(minijinja::Value::from_safe_string(json))
}

impl RenderTemplate for OutputTemplate {
    fn render(&self, context: &Value) -> Result<String, BoxError> {
        let template = self.env.get_template(TEMPLATE_NAME)?;
        Ok(template.render(context)?)
    }
}
