use crate::{MailerError, templates::TemplateData};
use askama::Template;
use serde::{Deserialize, Serialize};

/// Site identification shown in the footer of every notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateContext {
    pub site_name: String,
    pub site_url: String,
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self {
            site_name: "Bastion".to_string(),
            site_url: "http://localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedLoginDetails {
    pub identity: String,
    pub origin: String,
    pub failed_attempts: u32,
    /// Human readable lockout window, e.g. "15 minutes".
    pub window: String,
    pub occurred_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessfulLoginDetails {
    pub identity: String,
    pub origin: String,
    pub roles: Vec<String>,
    pub user_agent: Option<String>,
    pub occurred_at: String,
}

#[derive(Template)]
#[template(
    source = r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Blocked login attempt - {{ site_name }}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 20px; background-color: #f4f4f4; }
        .container { max-width: 600px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; }
        .alert { padding: 12px; background: #fdecea; border-left: 4px solid #dc3232; }
        .footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="container">
        <h2>Blocked login attempt</h2>

        <p class="alert">Someone made too many failed login attempts and has been temporarily blocked.</p>

        <ul>
            <li><strong>Username:</strong> {{ identity }}</li>
            <li><strong>IP address:</strong> {{ origin }}</li>
            <li><strong>Failed attempts:</strong> {{ failed_attempts }}</li>
            <li><strong>Lockout window:</strong> {{ window }}</li>
        </ul>

        <div class="footer">
            <p><strong>Site:</strong> {{ site_name }} ({{ site_url }})</p>
            <p><strong>Time:</strong> {{ occurred_at }}</p>
        </div>
    </div>
</body>
</html>
"#,
    ext = "html"
)]
pub struct BlockedLoginTemplate {
    pub site_name: String,
    pub site_url: String,
    pub identity: String,
    pub origin: String,
    pub failed_attempts: u32,
    pub window: String,
    pub occurred_at: String,
}

impl BlockedLoginTemplate {
    pub fn from_data(data: TemplateData) -> Result<Self, MailerError> {
        let context: TemplateContext = data.require("context").unwrap_or_default();
        let details: BlockedLoginDetails = data.require("details")?;

        Ok(Self {
            site_name: context.site_name,
            site_url: context.site_url,
            identity: details.identity,
            origin: details.origin,
            failed_attempts: details.failed_attempts,
            window: details.window,
            occurred_at: details.occurred_at,
        })
    }
}

#[derive(Template)]
#[template(
    source = r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Successful login - {{ site_name }}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 20px; background-color: #f4f4f4; }
        .container { max-width: 600px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; }
        .tip { padding: 10px; background: #fff3cd; border-left: 4px solid #ffc107; }
        .footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="container">
        <h2>Successful login</h2>

        <p>Someone signed in to the site.</p>

        <ul>
            <li><strong>User:</strong> {{ identity }}</li>
            <li><strong>Roles:</strong> {% if roles.is_empty() %}none{% else %}{{ roles|join(", ") }}{% endif %}</li>
            <li><strong>IP address:</strong> {{ origin }}</li>
            <li><strong>User agent:</strong> {% if let Some(agent) = user_agent %}{{ agent }}{% else %}unknown{% endif %}</li>
        </ul>

        <p class="tip">If this was not you, change your password immediately.</p>

        <div class="footer">
            <p><strong>Site:</strong> {{ site_name }} ({{ site_url }})</p>
            <p><strong>Time:</strong> {{ occurred_at }}</p>
        </div>
    </div>
</body>
</html>
"#,
    ext = "html"
)]
pub struct SuccessfulLoginTemplate {
    pub site_name: String,
    pub site_url: String,
    pub identity: String,
    pub origin: String,
    pub roles: Vec<String>,
    pub user_agent: Option<String>,
    pub occurred_at: String,
}

impl SuccessfulLoginTemplate {
    pub fn from_data(data: TemplateData) -> Result<Self, MailerError> {
        let context: TemplateContext = data.require("context").unwrap_or_default();
        let details: SuccessfulLoginDetails = data.require("details")?;

        Ok(Self {
            site_name: context.site_name,
            site_url: context.site_url,
            identity: details.identity,
            origin: details.origin,
            roles: details.roles,
            user_agent: details.user_agent,
            occurred_at: details.occurred_at,
        })
    }
}
