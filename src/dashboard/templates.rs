//! HTML templates for the web UI.
//!
//! Templates are embedded at compile time using `include_str!` and filled
//! with `render`, which substitutes `{{name}}` placeholders in one pass so
//! that substituted values are never scanned for further placeholders.

/// The base HTML layout with navigation.
pub const BASE_TEMPLATE: &str = include_str!("templates/base.html");

/// Create/edit form for a task.
pub const TASK_FORM_TEMPLATE: &str = include_str!("templates/task_form.html");

/// Create/edit form for a category.
pub const CATEGORY_FORM_TEMPLATE: &str = include_str!("templates/category_form.html");

/// Substitute `{{name}}` placeholders. Unknown placeholders render empty.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                if let Some((_, value)) = values.iter().find(|(key, _)| *key == name) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Top-level navigation sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Tasks,
    Categories,
    Statistics,
}

/// Wrap page content in the base layout. `title` and `message` are raw text.
pub fn layout(section: Section, title: &str, message: Option<&Flash>, content: &str) -> String {
    let active = |s: Section| if s == section { "active" } else { "" };
    let title = super::views::html_escape(title);
    let message = message.map(Flash::to_html).unwrap_or_default();
    render(
        BASE_TEMPLATE,
        &[
            ("title", &title),
            ("heading", &title),
            ("nav_tasks", active(Section::Tasks)),
            ("nav_categories", active(Section::Categories)),
            ("nav_statistics", active(Section::Statistics)),
            ("message", &message),
            ("content", content),
        ],
    )
}

/// One-shot status message carried in the `msg` query parameter as
/// `success:<text>` or `error:<text>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub success: bool,
    pub text: String,
}

impl Flash {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        if let Some(text) = raw.strip_prefix("success:") {
            Self::success(text)
        } else if let Some(text) = raw.strip_prefix("error:") {
            Self::error(text)
        } else {
            Self::success(raw)
        }
    }

    /// Encoded form for a redirect query string.
    pub fn to_query_value(&self) -> String {
        let prefix = if self.success { "success:" } else { "error:" };
        urlencoding::encode(&format!("{}{}", prefix, self.text)).into_owned()
    }

    pub fn to_html(&self) -> String {
        let class = if self.success {
            "message-success"
        } else {
            "message-error"
        };
        format!(
            r#"<div class="message {}">{}</div>"#,
            class,
            super::views::html_escape(&self.text)
        )
    }
}
