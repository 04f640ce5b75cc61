use crate::{MailerError, templates::TemplateData};
use askama::Template;
use async_trait::async_trait;
use regex::Regex;

#[async_trait]
pub trait TemplateEngine: Send + Sync {
    async fn render_html(
        &self,
        template_name: &str,
        data: TemplateData,
    ) -> Result<String, MailerError>;

    async fn render_text(
        &self,
        template_name: &str,
        data: TemplateData,
    ) -> Result<String, MailerError>;
}

/// Renders the compiled-in askama templates.
#[derive(Debug, Clone, Default)]
pub struct AskamaTemplateEngine;

impl AskamaTemplateEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TemplateEngine for AskamaTemplateEngine {
    async fn render_html(
        &self,
        template_name: &str,
        data: TemplateData,
    ) -> Result<String, MailerError> {
        match template_name {
            "blocked_login" => {
                let template = crate::templates::BlockedLoginTemplate::from_data(data)?;
                Ok(template.render()?)
            }
            "successful_login" => {
                let template = crate::templates::SuccessfulLoginTemplate::from_data(data)?;
                Ok(template.render()?)
            }
            other => Err(MailerError::UnknownTemplate(other.to_string())),
        }
    }

    async fn render_text(
        &self,
        template_name: &str,
        data: TemplateData,
    ) -> Result<String, MailerError> {
        // Text bodies are derived from the HTML rendering
        let html = self.render_html(template_name, data).await?;
        html_to_text(&html)
    }
}

fn html_to_text(html: &str) -> Result<String, MailerError> {
    let head = Regex::new(r"(?s)<head>.*?</head>")?;
    let tags = Regex::new(r"<[^>]*>")?;
    let blank_runs = Regex::new(r"\n\s*\n")?;

    let text = head
        .replace_all(html, "")
        .replace("</li>", "\n")
        .replace("</p>", "\n\n")
        .replace("</div>", "\n")
        .replace("</h2>", "\n\n");
    let text = tags.replace_all(&text, "");
    let text = blank_runs.replace_all(&text, "\n\n");

    Ok(text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string())
}
