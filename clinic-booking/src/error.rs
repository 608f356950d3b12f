//! Error types returned by booking collaborators.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Failures reported by a [`BookingStore`](crate::BookingStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("Booking store unavailable: {0}")]
    Unavailable(String),

    /// Another non-cancelled booking already holds this slot.
    #[error("Slot {date} {} is already booked", time.format("%H:%M"))]
    SlotTaken {
        /// The contested date.
        date: NaiveDate,
        /// The contested time.
        time: NaiveTime,
    },

    /// The store refused the write for another reason.
    #[error("Booking store rejected the request: {0}")]
    Rejected(String),
}

/// Failures reported by a [`BookingNotifier`](crate::BookingNotifier).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// The notifier is missing credentials or addresses.
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    /// The message could not be delivered.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Rejections produced while validating a dialogue answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("booking type is empty")]
    EmptyBookingType,

    #[error("unrecognised date: {0}")]
    InvalidDate(String),

    #[error("unrecognised time: {0}")]
    InvalidTime(String),

    #[error("phone number needs at least {min_digits} digits, got {digits}")]
    InvalidPhone { digits: usize, min_digits: usize },

    #[error("expected yes or no, got: {0}")]
    InvalidConfirmation(String),
}
