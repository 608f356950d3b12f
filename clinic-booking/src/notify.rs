//! Booking confirmation notifications.

use async_trait::async_trait;
use tracing::info;

use crate::error::NotifyError;
use crate::model::BookingConfirmation;
use crate::parse::format_time;

/// Clinic name used in confirmation emails and prompts.
pub const CLINIC_NAME: &str = "Smiles Dental Care";

/// Delivers a confirmation after a booking is stored.
///
/// Failures are reported to the caller but never undo the booking.
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn send_booking_confirmation(&self, confirmation: &BookingConfirmation) -> Result<(), NotifyError>;
}

/// Subject and plain-text body of a booking confirmation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEmail {
    pub subject: String,
    pub body: String,
}

impl ConfirmationEmail {
    pub fn render(confirmation: &BookingConfirmation, from_name: &str) -> Self {
        let subject = format!("Appointment Confirmation #{}", confirmation.booking_id);
        let body = format!(
            "Hi {name},\n\n\
             Your appointment has been booked successfully.\n\n\
             Booking details:\n\
             - Booking ID: {id}\n\
             - Type: {booking_type}\n\
             - Date: {date}\n\
             - Time: {time}\n\
             - Clinic: {CLINIC_NAME}\n\n\
             If you need to reschedule or cancel, please reply to this email.\n\n\
             Best regards,\n\
             {from_name}",
            name = confirmation.name,
            id = confirmation.booking_id,
            booking_type = confirmation.booking_type,
            date = confirmation.date.format("%Y-%m-%d"),
            time = format_time(confirmation.time),
        );
        Self { subject, body }
    }
}

/// Writes confirmations to the tracing log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BookingNotifier for LogNotifier {
    async fn send_booking_confirmation(&self, confirmation: &BookingConfirmation) -> Result<(), NotifyError> {
        info!(
            booking_id = %confirmation.booking_id,
            to = %confirmation.to_email,
            date = %confirmation.date,
            time = %format_time(confirmation.time),
            "Booking confirmation (not emailed)"
        );
        Ok(())
    }
}
