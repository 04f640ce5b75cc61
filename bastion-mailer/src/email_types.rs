use crate::{
    Email, MailerError,
    templates::{
        BlockedLoginDetails, SuccessfulLoginDetails, TemplateContext, TemplateData,
        TemplateEngine,
    },
};

pub struct BlockedLoginEmail;

impl BlockedLoginEmail {
    pub async fn build<T: TemplateEngine>(
        engine: &T,
        from: &str,
        to: &str,
        context: TemplateContext,
        details: BlockedLoginDetails,
    ) -> Result<Email, MailerError> {
        let subject = format!("[{}] Blocked login attempt", context.site_name);
        let template_data = TemplateData::new()
            .insert("context", &context)?
            .insert("details", &details)?;

        let html_body = engine
            .render_html("blocked_login", template_data.clone())
            .await?;
        let text_body = engine.render_text("blocked_login", template_data).await?;

        let email = Email::notification(from, to, subject)
            .with_text(text_body)
            .with_html(html_body);
        email.validate()?;
        Ok(email)
    }
}

pub struct SuccessfulLoginEmail;

impl SuccessfulLoginEmail {
    pub async fn build<T: TemplateEngine>(
        engine: &T,
        from: &str,
        to: &str,
        context: TemplateContext,
        details: SuccessfulLoginDetails,
    ) -> Result<Email, MailerError> {
        let subject = format!(
            "[{}] Successful login - {}",
            context.site_name, details.identity
        );
        let template_data = TemplateData::new()
            .insert("context", &context)?
            .insert("details", &details)?;

        let html_body = engine
            .render_html("successful_login", template_data.clone())
            .await?;
        let text_body = engine
            .render_text("successful_login", template_data)
            .await?;

        let email = Email::notification(from, to, subject)
            .with_text(text_body)
            .with_html(html_body);
        email.validate()?;
        Ok(email)
    }
}
