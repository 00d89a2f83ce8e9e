use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::config::{EmailConfig, EmailTransport};

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email relay is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Email relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Writes outgoing mail to the log instead of delivering it.
pub struct LogMailer {
    from: String,
}

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            "Email (log transport): {}",
            message.text
        );
        Ok(())
    }
}

/// Posts mail as JSON to an HTTP relay.
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    relay_token: Option<String>,
    from_name: String,
    from_email: String,
}

#[async_trait]
impl EmailSender for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let body = json!({
            "from": { "name": self.from_name, "email": self.from_email },
            "to": message.to,
            "subject": message.subject,
            "text": message.text,
        });
        let mut request = self.client.post(&self.relay_url).json(&body);
        if let Some(token) = &self.relay_token {
            request = request.bearer_auth(token);
        }
        request.send().await?.error_for_status()?;
        tracing::info!("Email sent to {}", message.to);
        Ok(())
    }
}

pub fn from_config(config: &EmailConfig) -> Result<Box<dyn EmailSender>, EmailError> {
    Ok(match config.transport {
        EmailTransport::Log => Box::new(LogMailer {
            from: format!("{} <{}>", config.from_name, config.from_email),
        }),
        EmailTransport::Http => {
            let relay_url = config.relay_url.clone().ok_or(EmailError::NotConfigured("EMAIL_RELAY_URL"))?;
            Box::new(HttpMailer {
                client: reqwest::Client::new(),
                relay_url,
                relay_token: config.relay_token.clone(),
                from_name: config.from_name.clone(),
                from_email: config.from_email.clone(),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn http_transport_requires_relay_url() {
        let mut config = AppConfig::development().email;
        config.transport = EmailTransport::Http;
        config.relay_url = None;
        assert!(matches!(from_config(&config), Err(EmailError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn log_transport_always_succeeds() {
        let mailer = from_config(&AppConfig::development().email).unwrap();
        let message = EmailMessage {
            to: "john@gmail.com".into(),
            subject: "Password reset token".into(),
            text: "hello".into(),
        };
        mailer.send(&message).await.unwrap();
    }
}
