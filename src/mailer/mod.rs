/// Email sending functionality
///
/// Delivery strategies are tried in order until one accepts the message:
/// SMTP on each configured port, then the transactional-email HTTP API.
use crate::{
    config::{EmailApiConfig, EmailConfig, SmtpConfig},
    error::{AppError, AppResult},
    metrics,
};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};

/// A plain-text message ready for delivery
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// One way of getting an email out
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Short label used in logs and metrics, e.g. `smtp:587`
    fn name(&self) -> String;

    async fn deliver(&self, email: &OutgoingEmail) -> AppResult<()>;
}

/// SMTP delivery on a single port
pub struct SmtpDelivery {
    port: u16,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpDelivery {
    /// 465 uses implicit TLS; every other port upgrades with STARTTLS
    pub fn new(config: &SmtpConfig, port: u16) -> AppResult<Self> {
        let builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| AppError::Internal(format!("SMTP setup failed: {}", e)))?
        .port(port);

        let builder = if config.username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
        };

        Ok(Self {
            port,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl EmailTransport for SmtpDelivery {
    fn name(&self) -> String {
        format!("smtp:{}", self.port)
    }

    async fn deliver(&self, email: &OutgoingEmail) -> AppResult<()> {
        let from: Mailbox = email
            .from
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid to address: {}", e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.text.clone())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Upstream(format!("SMTP send failed: {}", e)))?;

        Ok(())
    }
}

/// Transactional-email HTTP API delivery
pub struct ApiDelivery {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl ApiDelivery {
    pub fn new(config: &EmailApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl EmailTransport for ApiDelivery {
    fn name(&self) -> String {
        "api".to_string()
    }

    async fn deliver(&self, email: &OutgoingEmail) -> AppResult<()> {
        self.client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::Upstream(format!("Email API request failed: {}", e)))?;

        Ok(())
    }
}

/// Email mailer service
#[derive(Clone)]
pub struct Mailer {
    from_address: String,
    transports: Arc<Vec<Arc<dyn EmailTransport>>>,
    attempt_timeout: Duration,
}

impl Mailer {
    /// Create a new mailer; `None` yields a disabled mailer
    pub fn new(config: Option<&EmailConfig>) -> AppResult<Self> {
        let Some(config) = config else {
            return Ok(Self::disabled());
        };

        let mut transports: Vec<Arc<dyn EmailTransport>> = Vec::new();
        if let Some(smtp) = &config.smtp {
            for &port in &smtp.ports {
                transports.push(Arc::new(SmtpDelivery::new(smtp, port)?));
            }
        }
        if let Some(api) = &config.api {
            transports.push(Arc::new(ApiDelivery::new(api)));
        }

        Ok(Self::with_transports(
            &config.from_address,
            transports,
            Duration::from_secs(config.attempt_timeout_secs),
        ))
    }

    /// A mailer that logs and skips every message
    pub fn disabled() -> Self {
        Self::with_transports("", Vec::new(), Duration::from_secs(10))
    }

    /// Build from explicit strategies, tried in the given order
    pub fn with_transports(
        from_address: &str,
        transports: Vec<Arc<dyn EmailTransport>>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            from_address: from_address.to_string(),
            transports: Arc::new(transports),
            attempt_timeout,
        }
    }

    /// Check if email is configured
    pub fn is_configured(&self) -> bool {
        !self.transports.is_empty()
    }

    /// Send a message, falling through the strategies in order.
    ///
    /// Returns the name of the strategy that delivered it, or `None` when
    /// the mailer is disabled.
    pub async fn send(&self, to: &str, subject: &str, text: &str) -> AppResult<Option<String>> {
        if !self.is_configured() {
            tracing::warn!("Email not configured, skipping \"{}\" to {}", subject, to);
            return Ok(None);
        }

        let email = OutgoingEmail {
            from: self.from_address.clone(),
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
        };

        let mut failures = Vec::with_capacity(self.transports.len());
        for transport in self.transports.iter() {
            let name = transport.name();
            let outcome = match tokio::time::timeout(self.attempt_timeout, transport.deliver(&email)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Upstream(format!(
                    "timed out after {:?}",
                    self.attempt_timeout
                ))),
            };

            match outcome {
                Ok(()) => {
                    metrics::record_email_delivery(&name, true);
                    tracing::info!("Sent email to {} via {}: {}", to, name, subject);
                    return Ok(Some(name));
                }
                Err(e) => {
                    metrics::record_email_delivery(&name, false);
                    tracing::debug!("Email strategy {} failed: {}", name, e);
                    failures.push(format!("{}: {}", name, e));
                }
            }
        }

        Err(AppError::Upstream(format!(
            "All email strategies failed ({})",
            failures.join("; ")
        )))
    }

    /// Send on a background task; failures are logged, never returned
    pub fn dispatch(&self, to: String, subject: String, text: String) {
        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&to, &subject, &text).await {
                tracing::warn!("Notification email to {} failed: {}", to, e);
            }
        });
    }
}
