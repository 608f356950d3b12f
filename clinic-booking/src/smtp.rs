//! SMTP delivery of booking confirmations.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use crate::error::NotifyError;
use crate::model::BookingConfirmation;
use crate::notify::{BookingNotifier, ConfirmationEmail};

/// Sends confirmation emails through a STARTTLS relay.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    host: String,
    port: u16,
    username: String,
    password: Option<String>,
    from_name: String,
}

impl SmtpNotifier {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: None,
            from_name: "Clinic Assistant".to_string(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_from_name(mut self, from_name: impl Into<String>) -> Self {
        self.from_name = from_name.into();
        self
    }

    fn build_message(&self, confirmation: &BookingConfirmation) -> Result<Message, NotifyError> {
        let email = ConfirmationEmail::render(confirmation, &self.from_name);
        let from: Mailbox = format!("{} <{}>", self.from_name, self.username)
            .parse()
            .map_err(|e| NotifyError::NotConfigured(format!("Invalid from address: {e}")))?;
        let to: Mailbox = confirmation
            .to_email
            .parse()
            .map_err(|e| NotifyError::Delivery(format!("Invalid to address: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject)
            .body(email.body)
            .map_err(|e| NotifyError::Delivery(format!("Failed to build email: {e}")))
    }
}

#[async_trait]
impl BookingNotifier for SmtpNotifier {
    async fn send_booking_confirmation(&self, confirmation: &BookingConfirmation) -> Result<(), NotifyError> {
        let Some(password) = self.password.clone() else {
            error!("Email password not configured, cannot send confirmation");
            return Err(NotifyError::NotConfigured("EMAIL_PASSWORD is not set".to_string()));
        };

        let message = self.build_message(confirmation)?;
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .map_err(|e| NotifyError::Delivery(format!("SMTP relay error: {e}")))?
            .port(self.port)
            .credentials(Credentials::new(self.username.clone(), password))
            .build();

        mailer
            .send(message)
            .await
            .map_err(|e| NotifyError::Delivery(format!("SMTP send error: {e}")))?;

        info!(booking_id = %confirmation.booking_id, to = %confirmation.to_email, "Booking confirmation email sent");
        Ok(())
    }
}
