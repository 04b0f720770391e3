//! Popup content sources
//!
//! A popup is either produced by a caller-supplied function over the row or by
//! a `tera` template compiled once at construction time. Variables the row
//! has no cell for render as empty text.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tera::{Context, Tera};
use thiserror::Error;

use crate::row::Row;

const TEMPLATE_NAME: &str = "popup.html";

/// `{{ ... }}` and `{% ... %}` tags.
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{[{%](.*?)[}%]\}").expect("tag regex is valid"));
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier regex is valid"));

/// Every identifier used inside a tag. Keywords and filter names come along
/// too; binding them to empty text is harmless.
fn referenced_variables(source: &str) -> BTreeSet<String> {
    TAG.captures_iter(source)
        .filter_map(|tag| tag.get(1))
        .flat_map(|body| IDENTIFIER.find_iter(body.as_str()))
        .map(|ident| ident.as_str().to_string())
        .collect()
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read popup template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("popup template error: {0}")]
    Tera(#[from] tera::Error),
}

/// Caller-supplied popup renderer.
pub type ContentFn = Arc<dyn Fn(&Row) -> String + Send + Sync>;

/// A compiled popup template. Cell values are HTML-escaped unless the
/// template marks them `| safe`.
#[derive(Clone)]
pub struct PopupTemplate {
    tera: Arc<Tera>,
    variables: Arc<BTreeSet<String>>,
}

impl PopupTemplate {
    /// Compile a template from inline markup.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, source)?;
        Ok(Self {
            tera: Arc::new(tera),
            variables: Arc::new(referenced_variables(source)),
        })
    }

    /// Compile a template stored in a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::compile(&source)
    }

    /// Render the template with the row's cells as variables. Columns the
    /// row lacks render as empty text.
    pub fn render(&self, row: &Row) -> Result<String, TemplateError> {
        let mut context = Context::from_serialize(row)?;
        for variable in self.variables.iter() {
            if row.get(variable).is_none() {
                context.insert(variable.as_str(), "");
            }
        }
        Ok(self.tera.render(TEMPLATE_NAME, &context)?)
    }
}

impl fmt::Debug for PopupTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PopupTemplate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_row_cells() {
        let template = PopupTemplate::compile("<b>{{ name }}</b> {{ notes }}").unwrap();
        let row: Row = [("name", "Site A"), ("notes", "ok")].into_iter().collect();
        assert_eq!(template.render(&row).unwrap(), "<b>Site A</b> ok");
    }

    #[test]
    fn test_render_escapes_values() {
        let template = PopupTemplate::compile("{{ name }}").unwrap();
        let row: Row = [("name", "<i>x</i>")].into_iter().collect();
        assert_eq!(template.render(&row).unwrap(), "&lt;i&gt;x&lt;&#x2F;i&gt;");
    }

    #[test]
    fn test_compile_rejects_broken_template() {
        assert!(PopupTemplate::compile("{{ name ").is_err());
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let template = PopupTemplate::compile("<b>{{ name }}</b> [{{ notes }}]").unwrap();
        let row: Row = [("name", "Site A")].into_iter().collect();
        assert_eq!(template.render(&row).unwrap(), "<b>Site A</b> []");
    }

    #[test]
    fn test_missing_variable_is_falsy() {
        let template =
            PopupTemplate::compile("{{ name }}{% if notes %}: {{ notes }}{% endif %}").unwrap();
        let row: Row = [("name", "Site A")].into_iter().collect();
        assert_eq!(template.render(&row).unwrap(), "Site A");

        let row: Row = [("name", "Site A"), ("notes", "dry")].into_iter().collect();
        assert_eq!(template.render(&row).unwrap(), "Site A: dry");
    }

    #[test]
    fn test_referenced_variables() {
        let variables = referenced_variables("{{ name | upper }} {% if notes %}x{% endif %} {# c #}");
        assert!(variables.contains("name"));
        assert!(variables.contains("notes"));
        assert!(!variables.contains("c"));
    }
}
