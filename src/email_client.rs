use async_trait::async_trait;
use serde::Serialize;

use crate::error::AuthError;
use crate::validators::is_valid_email;

/// Transport collaborator for delivering reset links. The workflow only
/// depends on this trait, so tests substitute a recording mock.
#[async_trait]
pub trait ResetLinkMailer: Send + Sync {
    async fn send_reset_link(&self, recipient: &str, link: &str) -> Result<(), AuthError>;
}

#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: SenderAddress,
}

#[derive(Clone)]
pub struct SenderAddress(String);

impl SenderAddress {
    pub fn parse(s: String) -> Result<Self, String> {
        let email = is_valid_email(&s).map_err(|e| format!("{:?}", e))?;
        Ok(Self(email))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
pub struct SendEmailRequest {
    from: String,
    to: String,
    #[serde(rename = "Subject")]
    subject: String,
    #[serde(rename = "Html")]
    html: String,
}

impl EmailClient {
    pub fn new(base_url: String, sender: SenderAddress, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            base_url,
            sender,
        }
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), AuthError> {
        let url = format!("{}/email", self.base_url);
        let request = SendEmailRequest {
            from: self.sender.inner().to_string(),
            to: recipient.to_string(),
            subject: subject.to_string(),
            html: html_content.to_string(),
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "failed to send email");
                AuthError::Internal(format!("Failed to send email: {}", e))
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!(error = %e, "email service returned error");
                AuthError::Internal(format!("Email service error: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait]
impl ResetLinkMailer for EmailClient {
    async fn send_reset_link(&self, recipient: &str, link: &str) -> Result<(), AuthError> {
        let html = format!(
            "<p>A password reset was requested for your account.</p>\
             <p><a href=\"{}\">Choose a new password</a></p>\
             <p>The link is valid for 15 minutes. If you did not request \
             this, you can ignore this email.</p>",
            link
        );
        self.send_email(recipient, "Password reset", &html).await
    }
}
