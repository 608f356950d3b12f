//! Appointment booking dialogue for the clinic assistant.
//!
//! A booking is gathered one answer at a time: booking type, date, time and
//! (when none is on file) a phone number, followed by a yes/no confirmation.
//! [`BookingFlow`] applies the transition rules to a caller-owned
//! [`BookingSession`] and talks to its collaborators through the
//! [`BookingStore`] and [`BookingNotifier`] traits.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::NaiveDate;
//! use clinic_booking::{BookingFlow, BookingSession, BookingState, InMemoryBookingStore, LogNotifier, PatientProfile};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let flow = BookingFlow::new(Arc::new(InMemoryBookingStore::new()), Arc::new(LogNotifier::new()))
//!     .with_today(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
//! let profile = PatientProfile::new("u-1", "Dana", "dana@example.com").with_phone("5551234");
//! let mut session = BookingSession::new();
//!
//! for message in ["book an appointment", "Cleaning", "2030-01-02", "09:00"] {
//!     flow.handle(&mut session, &profile, message).await;
//! }
//! let turn = flow.handle(&mut session, &profile, "yes").await;
//! assert_eq!(turn.state, BookingState::Committed);
//! assert!(!session.is_active());
//! # });
//! ```
//!
//! # Features
//!
//! - `smtp`: [`smtp::SmtpNotifier`] delivering confirmations by email

pub mod error;
pub mod machine;
pub mod model;
pub mod notify;
pub mod parse;
pub mod session;
pub mod store;

#[cfg(feature = "smtp")]
pub mod smtp;

pub use error::{NotifyError, ParseError, StoreError};
pub use machine::{BookingFlow, Turn};
pub use model::{BookingConfirmation, BookingId, BookingRecord, BookingStatus, NewBooking, PatientProfile};
pub use notify::{BookingNotifier, CLINIC_NAME, ConfirmationEmail, LogNotifier};
pub use parse::{
    Confirmation, DATE_FORMATS, MIN_PHONE_DIGITS, is_booking_intent, is_cancel_keyword, normalize_phone,
    parse_booking_type, parse_confirmation, parse_date, parse_time,
};
pub use session::{AwaitingField, BookingSession, BookingSlots, BookingState};
pub use store::{BookingStore, InMemoryBookingStore, InMemoryUploadStore, UploadRecord, UploadStore};
