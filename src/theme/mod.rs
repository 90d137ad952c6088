//! Theme engine
//!
//! Template rendering with Tera.
//! - Templates are embedded in the binary from `templates/`
//! - A theme directory on disk may override any template by name
//! - Standard template variables are injected on every page

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

use crate::models::User;

mod error;

pub use error::ThemeError;

/// Templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Theme engine for rendering templates
pub struct ThemeEngine {
    /// Tera template engine instance
    tera: Tera,
    /// Path to themes directory
    themes_path: PathBuf,
    /// Active theme name
    current_theme: String,
    /// Templates loaded from disk instead of the embedded copies
    overrides: Vec<String>,
}

impl ThemeEngine {
    /// Create a theme engine using `themes_path/theme_name` for overrides.
    ///
    /// A missing theme directory is not an error: the embedded templates
    /// are used as they are.
    pub fn new(themes_path: &Path, theme_name: &str) -> Result<Self> {
        let mut engine = Self {
            tera: Tera::default(),
            themes_path: themes_path.to_path_buf(),
            current_theme: theme_name.to_string(),
            overrides: Vec::new(),
        };

        engine.load_templates()?;

        if engine.overrides.is_empty() {
            tracing::debug!("Theme '{}' has no overrides, using embedded templates", theme_name);
        } else {
            tracing::info!(
                "Theme '{}' overrides {} template(s)",
                theme_name,
                engine.overrides.len()
            );
        }

        Ok(engine)
    }

    /// Engine with only the embedded templates
    pub fn embedded() -> Result<Self> {
        let mut engine = Self {
            tera: Tera::default(),
            themes_path: PathBuf::new(),
            current_theme: "default".to_string(),
            overrides: Vec::new(),
        };
        engine.load_templates()?;
        Ok(engine)
    }

    /// Build a fresh Tera instance from embedded templates plus overrides
    fn load_templates(&mut self) -> Result<()> {
        let mut templates: BTreeMap<String, String> = BTreeMap::new();

        for name in EmbeddedTemplates::iter() {
            if let Some(file) = EmbeddedTemplates::get(&name) {
                let content = String::from_utf8(file.data.into_owned())
                    .with_context(|| format!("Embedded template is not UTF-8: {}", name))?;
                templates.insert(name.replace('\\', "/"), content);
            }
        }

        let mut overrides = Vec::new();
        if let Some(theme_path) = self.theme_dir() {
            let mut found = Vec::new();
            collect_templates_from_dir(&theme_path, &theme_path, &mut found)?;
            for (name, content) in found {
                overrides.push(name.clone());
                templates.insert(name, content);
            }
        }
        overrides.sort();

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(format!("Failed to load templates: {}", describe(&e))))?;

        self.tera = tera;
        self.overrides = overrides;
        Ok(())
    }

    /// On-disk directory of the active theme, if there is one.
    /// A `dist/` subdirectory takes precedence over the theme root.
    fn theme_dir(&self) -> Option<PathBuf> {
        if self.themes_path.as_os_str().is_empty() {
            return None;
        }

        let theme_path = self.themes_path.join(&self.current_theme);
        if !theme_path.is_dir() {
            return None;
        }

        let dist_path = theme_path.join("dist");
        if dist_path.is_dir() {
            Some(dist_path)
        } else {
            Some(theme_path)
        }
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e))).into()
        })
    }

    /// Render a template with standard variables automatically added
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        standard_vars.apply(&mut full_context);
        full_context.insert("theme_name", &self.current_theme);
        self.render(template, &full_context)
    }

    /// Render a template, falling back to `error.html` and then to a
    /// minimal inline page. Always produces HTML.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Failed to render template '{}': {}, trying error template", template, e);

                let mut error_context = context.clone();
                error_context.insert("error_message", &e.to_string());
                error_context.insert("requested_template", template);

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::warn!(
                            "Failed to render error template: {}, returning simple HTML error page",
                            error_template_err
                        );
                        Self::simple_error_page(template, &e.to_string())
                    }
                }
            }
        }
    }

    /// Last-resort error page when no template can be rendered
    fn simple_error_page(template: &str, error: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Template Error</title>
</head>
<body>
    <h1>Template Error</h1>
    <p>Failed to render template: <code>{}</code></p>
    <p>{}</p>
</body>
</html>"#,
            tera::escape_html(template),
            tera::escape_html(error)
        )
    }

    /// Reload templates from disk (for theme development)
    pub fn reload_templates(&mut self) -> Result<()> {
        self.load_templates()
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Names of templates loaded from the theme directory
    pub fn overridden_templates(&self) -> &[String] {
        &self.overrides
    }

    pub fn get_current_theme(&self) -> &str {
        &self.current_theme
    }
}

/// Collect `.html` files under `current_path`, named relative to `base_path`
fn collect_templates_from_dir(
    base_path: &Path,
    current_path: &Path,
    templates: &mut Vec<(String, String)>,
) -> Result<()> {
    for entry in fs::read_dir(current_path)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_templates_from_dir(base_path, &path, templates)?;
        } else if path.extension().map_or(false, |ext| ext == "html") {
            let relative_path = path
                .strip_prefix(base_path)
                .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;

            let template_name = relative_path.to_string_lossy().replace('\\', "/");

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template: {:?}", path))?;

            templates.push((template_name, content));
        }
    }

    Ok(())
}

/// Tera error with its chain of causes
fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Variables available on every page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardTemplateVars {
    pub site_name: String,
    pub site_description: String,
    /// Signed-in user, if any
    pub current_user: Option<CurrentUser>,
    /// Current request path
    pub request_path: String,
    /// Current year (for the footer)
    pub year: i32,
}

/// Signed-in user as seen by templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    /// "First Last", or the username
    pub display_name: String,
    pub role: String,
    pub is_admin: bool,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name(),
            role: user.role.to_string(),
            is_admin: user.is_admin(),
        }
    }
}

impl StandardTemplateVars {
    pub fn new(
        site_name: impl Into<String>,
        site_description: impl Into<String>,
        request_path: impl Into<String>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            site_description: site_description.into(),
            current_user: None,
            request_path: request_path.into(),
            year: chrono::Utc::now().year(),
        }
    }

    pub fn with_user(mut self, user: CurrentUser) -> Self {
        self.current_user = Some(user);
        self
    }

    /// Insert the variables into a Tera context
    pub fn apply(&self, context: &mut TeraContext) {
        context.insert("site_name", &self.site_name);
        context.insert("site_description", &self.site_description);
        context.insert("request_path", &self.request_path);
        context.insert("year", &self.year);
        if let Some(ref user) = self.current_user {
            context.insert("current_user", user);
        }
    }
}
