//! Theme engine
//!
//! Pages are rendered with Tera from the templates embedded in the binary
//! (the `templates/` directory). When `theme.path` is configured, every
//! `.html` file found there replaces the embedded template of the same name,
//! so a site can restyle single pages without rebuilding.
//!
//! HTML templates are autoescaped.

use rust_embed::RustEmbed;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::Path;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::ThemeError;

/// Templates shipped with the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Renders the site's pages
pub struct ThemeEngine {
    tera: Tera,
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("templates", &self.template_names())
            .finish()
    }
}

impl ThemeEngine {
    /// Build the engine from the embedded templates, applying overrides from
    /// `override_dir` when given.
    pub fn new(override_dir: Option<&Path>) -> Result<Self, ThemeError> {
        let mut templates = embedded_templates()?;

        if let Some(dir) = override_dir {
            if dir.is_dir() {
                let mut overrides = Vec::new();
                collect_templates_from_dir(dir, dir, &mut overrides)?;
                for (name, content) in overrides {
                    tracing::info!("Template '{}' overridden from {:?}", name, dir);
                    templates.insert(name, content);
                }
            } else {
                tracing::warn!("Theme directory {:?} not found, using embedded templates", dir);
            }
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(describe(&e)))?;

        Ok(Self { tera })
    }

    /// Engine with only the embedded templates
    pub fn embedded() -> Result<Self, ThemeError> {
        Self::new(None)
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ThemeError> {
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e)))
        })
    }

    /// Names of every loaded template
    pub fn template_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }

    /// Minimal page used when even the error template cannot be rendered
    pub fn fallback_error_page(status: u16, message: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{status} | uBlog</title></head>
<body>
    <h1>{status}</h1>
    <p>{message}</p>
    <p><a href="/">Back to home</a></p>
</body>
</html>"#,
            status = status,
            message = message
        )
    }
}

/// Flatten an error and its causes into one line
fn describe(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  Caused by: {}", cause));
        source = cause.source();
    }
    message
}

fn embedded_templates() -> Result<BTreeMap<String, String>, ThemeError> {
    let mut templates = BTreeMap::new();
    for name in EmbeddedTemplates::iter() {
        let Some(file) = EmbeddedTemplates::get(&name) else {
            continue;
        };
        let content = String::from_utf8(file.data.into_owned())
            .map_err(|_| ThemeError::InvalidEncoding(name.to_string()))?;
        templates.insert(name.to_string(), content);
    }
    Ok(templates)
}

/// Collect `.html` files under `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<(), ThemeError> {
    for entry in fs::read_dir(current_path)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
            let template_name = relative_path.to_string_lossy().replace('\\', "/");
            templates.push((template_name, fs::read_to_string(&path)?));
        }
    }

    Ok(())
}
