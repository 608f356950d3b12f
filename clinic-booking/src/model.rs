//! Booking records and the payloads exchanged with collaborators.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the booking store on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub u64);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The signed-in patient a conversation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl PatientProfile {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), name: name.into(), email: email.into(), phone: None }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Whether a booking in this status still occupies its slot.
    pub fn holds_slot(self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

/// A stored booking, as listed for conflict detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: BookingId,
    pub user_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_type: Option<String>,
    pub status: BookingStatus,
}

impl BookingRecord {
    /// Whether this booking blocks a new booking at `date` and `time`.
    pub fn conflicts_with(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.date == date && self.time == time && self.status.holds_slot()
    }
}

/// The finalized slots handed to the store on confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub user_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub reason: String,
    pub booking_type: String,
}

/// Payload for the booking confirmation notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub to_email: String,
    pub name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub booking_id: BookingId,
    pub booking_type: String,
}
