use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{info, warn};

use crate::config::MailConfig;

/// Outbound mail boundary. Delivery failures are the caller's to log, not
/// to propagate into the request that triggered them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_confirmation(
        &self,
        to_email: &str,
        username: &str,
        confirm_url: &str,
    ) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    /// Send an email with HTML and plain text versions.
    async fn send(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> anyhow::Result<()> {
        let smtp_host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, from_address).parse()?;
        let to: Mailbox = to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        mailer.build().send(email).await?;

        info!(to = %to_email, subject = %subject, "email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_confirmation(
        &self,
        to_email: &str,
        username: &str,
        confirm_url: &str,
    ) -> anyhow::Result<()> {
        if !self.config.is_configured() {
            warn!(to = %to_email, "mail not configured, skipping confirmation email");
            return Ok(());
        }

        let html_body = render_confirmation_html(username, confirm_url);
        let text_body = render_confirmation_text(username, confirm_url);
        self.send(to_email, "Confirm your email", &html_body, &text_body)
            .await
    }
}

fn render_confirmation_html(username: &str, confirm_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Confirm your email</title>
</head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, Arial, sans-serif; color: #374151;">
    <div style="max-width: 560px; margin: 0 auto; padding: 32px 20px;">
        <h1 style="font-size: 22px;">Confirm your email</h1>
        <p>Hi <strong>{username}</strong>,</p>
        <p>Thanks for signing up. Click the button below to confirm this email address and activate your account.</p>
        <p style="margin: 28px 0;">
            <a href="{confirm_url}" style="background-color: #2563eb; color: #ffffff; text-decoration: none; padding: 12px 28px; border-radius: 6px;">Confirm email</a>
        </p>
        <p style="color: #6b7280; font-size: 13px;">If the button does not work, open this link:<br>{confirm_url}</p>
        <p style="color: #6b7280; font-size: 13px;">If you didn't create an account, you can safely ignore this email.</p>
    </div>
</body>
</html>"#,
        username = html_escape(username),
        confirm_url = confirm_url,
    )
}

fn render_confirmation_text(username: &str, confirm_url: &str) -> String {
    format!(
        r#"Confirm your email

Hi {username},

Thanks for signing up. Open the link below to confirm this email address
and activate your account:

{confirm_url}

If you didn't create an account, you can safely ignore this email."#,
        username = username,
        confirm_url = confirm_url,
    )
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("Tom & Jerry"), "Tom &amp; Jerry");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
    }

    #[test]
    fn test_render_confirmation_text() {
        let text =
            render_confirmation_text("agent007", "https://example.com/api/auth/confirm/tok");
        assert!(text.contains("agent007"));
        assert!(text.contains("https://example.com/api/auth/confirm/tok"));
    }

    #[test]
    fn test_render_confirmation_html() {
        let html =
            render_confirmation_html("agent007", "https://example.com/api/auth/confirm/tok");
        assert!(html.contains("agent007"));
        assert!(html.contains("https://example.com/api/auth/confirm/tok"));
        assert!(html.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn test_render_escapes_username() {
        let html = render_confirmation_html("<bob>", "https://example.com/c/t");
        assert!(html.contains("&lt;bob&gt;"));
        assert!(!html.contains("<bob>"));
    }
}
