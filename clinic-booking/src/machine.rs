//! The booking dialogue state machine.
//!
//! [`BookingFlow`] owns the collaborators and the transition rules; the
//! per-conversation [`BookingSession`] is passed in by `&mut` on every
//! turn, so one flow serves any number of conversations.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime};
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::model::{BookingConfirmation, BookingId, PatientProfile};
use crate::notify::BookingNotifier;
use crate::parse::{
    Confirmation, format_time, is_booking_intent, is_cancel_keyword, normalize_phone, parse_booking_type,
    parse_confirmation, parse_date, parse_time,
};
use crate::session::{BookingSession, BookingSlots, BookingState};
use crate::store::BookingStore;

const TYPE_PROMPT: &str = "What type of booking is this? (e.g., 'Root canal', 'Check-up', 'Cleaning')";
const DATE_PROMPT: &str = "Please enter your preferred *date* in format `YYYY-MM-DD`.";
const TIME_PROMPT: &str = "Please enter your preferred *time* in 24h format `HH:MM` (e.g., 14:30).";
const PHONE_PROMPT: &str = "Please share your phone number (digits only).";
const CONFIRM_PROMPT: &str = "Please reply with **yes** to confirm or **no** to cancel.";
const CANCELLED_REPLY: &str =
    "Okay, I've cancelled this booking request. If you want to start again, just say 'book appointment'.";
const SAVE_FAILED_REPLY: &str = "Something went wrong while saving your booking. Please try again later.";
const RESTART_REPLY: &str = "I'm not sure which detail we're on. Let's start over. Say 'book appointment' to begin.";

/// The outcome of one dialogue turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Text to show the patient.
    pub reply: String,
    /// State reached by this turn. `Committed` and `Cancelled` are reported
    /// here even though the session has already been reset.
    pub state: BookingState,
    /// Set on the turn that commits a booking.
    pub booking_id: Option<BookingId>,
}

impl Turn {
    fn new(reply: impl Into<String>, state: BookingState) -> Self {
        Self { reply: reply.into(), state, booking_id: None }
    }
}

/// Drives booking conversations against a store and a notifier.
#[derive(Clone)]
pub struct BookingFlow {
    store: Arc<dyn BookingStore>,
    notifier: Arc<dyn BookingNotifier>,
    today: Option<NaiveDate>,
}

impl BookingFlow {
    pub fn new(store: Arc<dyn BookingStore>, notifier: Arc<dyn BookingNotifier>) -> Self {
        Self { store, notifier, today: None }
    }

    /// Pins the date used to reject past appointments.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Processes one patient message.
    ///
    /// An inactive session is entered first: contact details are copied from
    /// `profile`, and unless `message` is itself a booking request it is
    /// taken as the answer to the booking type question.
    pub async fn handle(&self, session: &mut BookingSession, profile: &PatientProfile, message: &str) -> Turn {
        let message = message.trim();

        if is_cancel_keyword(message) {
            debug!(state = %session.state, "Booking cancelled by keyword");
            session.reset();
            return Turn::new(CANCELLED_REPLY, BookingState::Cancelled);
        }

        if !session.is_active() {
            return self.enter(session, profile, message);
        }

        let turn = match session.state {
            BookingState::CollectingType => self.collect_type(session, message),
            BookingState::CollectingDate => self.collect_date(session, message),
            BookingState::CollectingTime => self.collect_time(session, message).await,
            BookingState::CollectingPhone => self.collect_phone(session, message),
            BookingState::Confirming => self.confirm(session, profile, message).await,
            BookingState::Inactive | BookingState::Committed | BookingState::Cancelled => {
                session.reset();
                Turn::new(RESTART_REPLY, BookingState::Inactive)
            }
        };
        debug!(state = %turn.state, "Booking turn handled");
        turn
    }

    fn enter(&self, session: &mut BookingSession, profile: &PatientProfile, message: &str) -> Turn {
        session.reset();
        session.slots = BookingSlots::from_profile(profile);
        session.state = BookingState::CollectingType;
        info!(user_id = %profile.user_id, "Booking flow started");

        if message.is_empty() || is_booking_intent(message) {
            return Turn::new(
                format!("Great! Let's book an appointment.\n\n{TYPE_PROMPT}"),
                BookingState::CollectingType,
            );
        }
        self.collect_type(session, message)
    }

    fn collect_type(&self, session: &mut BookingSession, message: &str) -> Turn {
        let booking_type = match parse_booking_type(message) {
            Ok(booking_type) => booking_type,
            Err(e) => {
                debug!(error = %e, "Rejected booking type");
                return Turn::new(TYPE_PROMPT, BookingState::CollectingType);
            }
        };
        let reply = format!("Got it: **{booking_type}**.\n\n{DATE_PROMPT}");
        session.slots.booking_type = Some(booking_type);
        session.state = BookingState::CollectingDate;
        Turn::new(reply, BookingState::CollectingDate)
    }

    fn collect_date(&self, session: &mut BookingSession, message: &str) -> Turn {
        let date = match parse_date(message) {
            Ok(date) => date,
            Err(e) => {
                debug!(error = %e, "Rejected booking date");
                return Turn::new(
                    format!("I couldn't understand that date. {DATE_PROMPT}"),
                    BookingState::CollectingDate,
                );
            }
        };

        if date < self.today() {
            return Turn::new(
                format!("The date seems to be in the past. {DATE_PROMPT}"),
                BookingState::CollectingDate,
            );
        }

        session.slots.date = Some(date);
        session.state = BookingState::CollectingTime;
        Turn::new(TIME_PROMPT, BookingState::CollectingTime)
    }

    async fn collect_time(&self, session: &mut BookingSession, message: &str) -> Turn {
        let time = match parse_time(message) {
            Ok(time) => time,
            Err(e) => {
                debug!(error = %e, "Rejected booking time");
                return Turn::new("Please use 24h format `HH:MM`, e.g. 09:30 or 14:00.", BookingState::CollectingTime);
            }
        };

        let Some(date) = session.slots.date else {
            session.reset();
            return Turn::new(RESTART_REPLY, BookingState::Inactive);
        };

        if self.slot_is_taken(date, time).await {
            return Turn::new(slot_taken_reply(date, time), BookingState::CollectingTime);
        }

        session.slots.time = Some(time);
        self.advance_after_time(session)
    }

    fn advance_after_time(&self, session: &mut BookingSession) -> Turn {
        if session.slots.phone.is_none() {
            session.state = BookingState::CollectingPhone;
            return Turn::new(PHONE_PROMPT, BookingState::CollectingPhone);
        }
        session.state = BookingState::Confirming;
        Turn::new(render_summary(&session.slots), BookingState::Confirming)
    }

    fn collect_phone(&self, session: &mut BookingSession, message: &str) -> Turn {
        match normalize_phone(message) {
            Ok(phone) => {
                session.slots.phone = Some(phone);
                session.state = BookingState::Confirming;
                Turn::new(render_summary(&session.slots), BookingState::Confirming)
            }
            Err(e) => {
                debug!(error = %e, "Rejected phone number");
                Turn::new(
                    "That doesn't look like a valid phone number. Please re-enter.",
                    BookingState::CollectingPhone,
                )
            }
        }
    }

    async fn confirm(&self, session: &mut BookingSession, profile: &PatientProfile, message: &str) -> Turn {
        match parse_confirmation(message) {
            Ok(Confirmation::Yes) => self.commit(session, profile).await,
            Ok(Confirmation::No) => {
                session.reset();
                Turn::new(CANCELLED_REPLY, BookingState::Cancelled)
            }
            Err(_) => Turn::new(CONFIRM_PROMPT, BookingState::Confirming),
        }
    }

    async fn commit(&self, session: &mut BookingSession, profile: &PatientProfile) -> Turn {
        let Some(booking) = session.slots.to_new_booking(&profile.user_id) else {
            warn!(user_id = %profile.user_id, "Confirmation reached with incomplete slots");
            session.reset();
            return Turn::new(RESTART_REPLY, BookingState::Inactive);
        };
        let (date, time, booking_type) = (booking.date, booking.time, booking.booking_type.clone());

        let booking_id = match self.store.save_booking(booking).await {
            Ok(id) => id,
            Err(StoreError::SlotTaken { date, time }) => {
                info!(%date, time = %format_time(time), "Slot taken by a concurrent booking");
                session.slots.time = None;
                session.state = BookingState::CollectingTime;
                return Turn::new(slot_taken_reply(date, time), BookingState::CollectingTime);
            }
            Err(e) => {
                error!(user_id = %profile.user_id, error = %e, "Failed to save booking");
                session.reset();
                return Turn::new(SAVE_FAILED_REPLY, BookingState::Inactive);
            }
        };
        session.booking_id = Some(booking_id);
        info!(booking_id = %booking_id, user_id = %profile.user_id, "Booking committed");

        let confirmation = BookingConfirmation {
            to_email: session.slots.email.clone().unwrap_or_else(|| profile.email.clone()),
            name: session.slots.name.clone().unwrap_or_else(|| profile.name.clone()),
            date,
            time,
            booking_id,
            booking_type,
        };
        let emailed = match self.notifier.send_booking_confirmation(&confirmation).await {
            Ok(()) => true,
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "Booking confirmation not delivered");
                false
            }
        };

        session.reset();
        let mut reply = format!(
            "Your appointment is booked!\n\n\
             • Booking ID: **{booking_id}**\n\
             • Date: **{}**\n\
             • Time: **{}**",
            date.format("%Y-%m-%d"),
            format_time(time),
        );
        if emailed {
            reply.push_str(&format!("\n\nA confirmation has been sent to **{}**.", confirmation.to_email));
        }
        Turn { reply, state: BookingState::Committed, booking_id: Some(booking_id) }
    }

    /// Whether a non-cancelled booking already occupies the slot. A store
    /// that cannot list bookings is treated as having none; the store still
    /// enforces uniqueness at commit.
    async fn slot_is_taken(&self, date: NaiveDate, time: NaiveTime) -> bool {
        match self.store.list_bookings().await {
            Ok(records) => records.iter().any(|record| record.conflicts_with(date, time)),
            Err(e) => {
                warn!(error = %e, "Could not list bookings, skipping conflict check");
                false
            }
        }
    }
}

fn slot_taken_reply(date: NaiveDate, time: NaiveTime) -> String {
    format!(
        "Sorry, the slot at {} on {} is already booked. Please choose a different time.",
        format_time(time),
        date.format("%Y-%m-%d"),
    )
}

fn render_summary(slots: &BookingSlots) -> String {
    let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "Not provided yet".to_string());
    format!(
        "Here are your booking details:\n\n\
         • Name: **{name}**\n\
         • Email: **{email}**\n\
         • Phone: **{phone}**\n\
         • Type: **{booking_type}**\n\
         • Date: **{date}**\n\
         • Time: **{time}**\n\n\
         Please confirm to proceed:\n\
         - Reply **yes** to confirm and save the booking\n\
         - Reply **no** to cancel",
        name = text(&slots.name),
        email = text(&slots.email),
        phone = text(&slots.phone),
        booking_type = text(&slots.booking_type),
        date = slots.date.map(|date| date.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        time = slots.time.map(format_time).unwrap_or_default(),
    )
}
