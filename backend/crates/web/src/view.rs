//! Views
//!
//! Templates are HTML files with a small mustache-like syntax:
//!
//! - `{{ user.name }}` prints a value, HTML-escaped; missing paths print nothing
//! - `{{#flash.error}} ... {{/flash.error}}` keeps the block when the value is truthy
//! - `{{^auth_user}} ... {{/auth_user}}` keeps the block when it is not
//!
//! Anything richer belongs in a real template engine behind [`ViewRenderer`].

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template syntax error in {template}: {message}")]
    Syntax { template: String, message: String },

    #[error("Failed to read templates: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk template directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Render a named template with a JSON context
pub trait ViewRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<String, ViewError>;

    fn has_template(&self, template: &str) -> bool;
}

/// Templates read once at startup, keyed by path relative to the views
/// directory without the `.html` extension (`auth/login`)
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    templates: HashMap<String, String>,
}

impl TemplateRenderer {
    /// Load every `*.html` file under `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ViewError> {
        let dir = dir.as_ref();
        let mut templates = HashMap::new();

        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "html") {
                continue;
            }

            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let name = relative
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");

            templates.insert(name, std::fs::read_to_string(path)?);
        }

        tracing::info!(
            templates = templates.len(),
            dir = %dir.display(),
            "Templates loaded"
        );

        Ok(Self { templates })
    }

    pub fn from_templates<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            templates: templates
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl ViewRenderer for TemplateRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<String, ViewError> {
        let source = self
            .templates
            .get(template)
            .ok_or_else(|| ViewError::TemplateNotFound(template.to_string()))?;

        render_source(source, context).map_err(|message| ViewError::Syntax {
            template: template.to_string(),
            message,
        })
    }

    fn has_template(&self, template: &str) -> bool {
        self.templates.contains_key(template)
    }
}

/// Render template text against `context`
pub fn render_source(source: &str, context: &Value) -> Result<String, String> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| "unclosed '{{'".to_string())?;
        let tag = after[..end].trim();
        rest = &after[end + 2..];

        let section = tag
            .strip_prefix('#')
            .map(|name| (name.trim(), false))
            .or_else(|| tag.strip_prefix('^').map(|name| (name.trim(), true)));

        if let Some((name, inverted)) = section {
            let close = format!("{{{{/{}}}}}", name);
            let close_at = rest
                .find(&close)
                .ok_or_else(|| format!("section '{}' is never closed", name))?;
            let inner = &rest[..close_at];
            rest = &rest[close_at + close.len()..];

            if is_truthy(lookup(context, name)) != inverted {
                out.push_str(&render_source(inner, context)?);
            }
        } else if let Some(name) = tag.strip_prefix('/') {
            return Err(format!("unexpected closing tag '{}'", name.trim()));
        } else {
            out.push_str(&escape_html(&display(lookup(context, tag))));
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Resolve a dotted path (`flash.errors.email`, `items.0`)
fn lookup<'a>(context: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(context, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Number(_)) => true,
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Escape the five HTML-significant characters
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Minimal page used when no error template is available
pub fn fallback_page(status: u16, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{status} {title}</title></head>\
         <body><h1>{status}</h1><p>{title}</p><p><a href=\"/\">Home</a></p></body></html>\n",
        status = status,
        title = escape_html(title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholders_are_escaped() {
        let html = render_source(
            "<p>Hello {{ user.name }}!</p>",
            &json!({ "user": { "name": "<b>Ada</b> & co" } }),
        )
        .unwrap();
        assert_eq!(html, "<p>Hello &lt;b&gt;Ada&lt;/b&gt; &amp; co!</p>");
    }

    #[test]
    fn test_missing_values_render_empty() {
        let html = render_source("[{{ nope }}][{{ a.b.c }}]", &json!({ "a": 1 })).unwrap();
        assert_eq!(html, "[][]");
    }

    #[test]
    fn test_sections() {
        let template = "{{#flash.error}}<div>{{ flash.error }}</div>{{/flash.error}}\
                        {{^auth_user}}<a>Login</a>{{/auth_user}}";

        let html = render_source(template, &json!({ "flash": { "error": "Bad" } })).unwrap();
        assert_eq!(html, "<div>Bad</div><a>Login</a>");

        let html = render_source(
            template,
            &json!({ "flash": {}, "auth_user": { "name": "Ada" } }),
        )
        .unwrap();
        assert_eq!(html, "");
    }

    #[test]
    fn test_array_index_and_numbers() {
        let html = render_source("{{ items.1 }} v{{ version }}", &json!({
            "items": ["a", "b"],
            "version": 1.5
        }))
        .unwrap();
        assert_eq!(html, "b v1.5");
    }

    #[test]
    fn test_syntax_errors() {
        assert!(render_source("{{ open", &json!({})).is_err());
        assert!(render_source("{{#a}}never closed", &json!({})).is_err());
        assert!(render_source("{{/a}}", &json!({})).is_err());
    }

    #[test]
    fn test_renderer_lookup() {
        let renderer = TemplateRenderer::from_templates([("home/index", "<h1>{{ title }}</h1>")]);
        assert!(renderer.has_template("home/index"));
        assert_eq!(
            renderer
                .render("home/index", &json!({ "title": "Hi" }))
                .unwrap(),
            "<h1>Hi</h1>"
        );
        assert!(matches!(
            renderer.render("missing", &json!({})),
            Err(ViewError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_fallback_page_escapes_title() {
        let page = fallback_page(404, "<Not Found>");
        assert!(page.contains("&lt;Not Found&gt;"));
        assert!(page.contains("404"));
    }
}
