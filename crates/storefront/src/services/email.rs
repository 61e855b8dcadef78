//! Email service for account activation mail.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Subject line of the activation mail.
pub const ACTIVATION_SUBJECT: &str = "Welcome to FreshMall";

/// HTML template for the activation email.
#[derive(Template)]
#[template(path = "email/register_active.html")]
pub struct ActivationEmailHtml<'a> {
    pub username: &'a str,
    pub activation_url: &'a str,
}

/// Plain text template for the activation email.
#[derive(Template)]
#[template(path = "email/register_active.txt")]
pub struct ActivationEmailText<'a> {
    pub username: &'a str,
    pub activation_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Link the user follows to activate their account.
#[must_use]
pub fn activation_url(base_url: &str, token: &str) -> String {
    format!("{}/user/active/{token}", base_url.trim_end_matches('/'))
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay settings are invalid.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let builder = if config.smtp_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let mailer = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            base_url: base_url.to_owned(),
        })
    }

    /// Send the account activation email.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_register_active(
        &self,
        to: &str,
        username: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let activation_url = activation_url(&self.base_url, token);
        let html = ActivationEmailHtml {
            username,
            activation_url: &activation_url,
        }
        .render()?;
        let text = ActivationEmailText {
            username,
            activation_url: &activation_url,
        }
        .render()?;

        self.send_multipart_email(to, ACTIVATION_SUBJECT, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
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

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_url() {
        assert_eq!(
            activation_url("https://shop.example.com/", "abc.def"),
            "https://shop.example.com/user/active/abc.def"
        );
    }

    #[test]
    fn test_activation_email_renders_link() {
        let url = "http://127.0.0.1:8000/user/active/abc.def";
        let html = ActivationEmailHtml {
            username: "alice01",
            activation_url: url,
        }
        .render()
        .unwrap();
        assert!(html.contains("alice01"));
        assert!(html.contains(r#"href="http://127.0.0.1:8000/user/active/abc.def""#));

        let text = ActivationEmailText {
            username: "alice01",
            activation_url: url,
        }
        .render()
        .unwrap();
        assert!(text.contains(url));
    }
}
