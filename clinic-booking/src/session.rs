//! Per-conversation booking state.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::model::{BookingId, NewBooking, PatientProfile};

/// The field the dialogue is currently waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwaitingField {
    BookingType,
    Date,
    Time,
    Phone,
    Confirm,
}

/// Where a booking conversation stands.
///
/// `Committed` and `Cancelled` are terminal: a session that reaches either
/// is reset to `Inactive`, and the terminal state is only reported through
/// the [`Turn`](crate::Turn) that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BookingState {
    #[default]
    Inactive,
    CollectingType,
    CollectingDate,
    CollectingTime,
    CollectingPhone,
    Confirming,
    Committed,
    Cancelled,
}

impl BookingState {
    pub fn awaiting_field(self) -> Option<AwaitingField> {
        match self {
            BookingState::CollectingType => Some(AwaitingField::BookingType),
            BookingState::CollectingDate => Some(AwaitingField::Date),
            BookingState::CollectingTime => Some(AwaitingField::Time),
            BookingState::CollectingPhone => Some(AwaitingField::Phone),
            BookingState::Confirming => Some(AwaitingField::Confirm),
            BookingState::Inactive | BookingState::Committed | BookingState::Cancelled => None,
        }
    }

    /// Whether a session in this state is mid-dialogue.
    pub fn is_active(self) -> bool {
        self.awaiting_field().is_some()
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingState::Inactive => "inactive",
            BookingState::CollectingType => "collecting_type",
            BookingState::CollectingDate => "collecting_date",
            BookingState::CollectingTime => "collecting_time",
            BookingState::CollectingPhone => "collecting_phone",
            BookingState::Confirming => "confirming",
            BookingState::Committed => "committed",
            BookingState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Values gathered so far in a booking conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSlots {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub booking_type: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl BookingSlots {
    /// Slots seeded with the contact details on file for `profile`.
    pub fn from_profile(profile: &PatientProfile) -> Self {
        Self {
            name: Some(profile.name.clone()),
            email: Some(profile.email.clone()),
            phone: profile.phone.clone().filter(|phone| !phone.trim().is_empty()),
            ..Self::default()
        }
    }

    /// The first slot, in filling order, that is still empty.
    pub fn first_missing(&self) -> Option<AwaitingField> {
        if self.booking_type.is_none() {
            Some(AwaitingField::BookingType)
        } else if self.date.is_none() {
            Some(AwaitingField::Date)
        } else if self.time.is_none() {
            Some(AwaitingField::Time)
        } else if self.phone.is_none() {
            Some(AwaitingField::Phone)
        } else {
            None
        }
    }

    /// The commit payload, once type, date and time are known.
    pub fn to_new_booking(&self, user_id: &str) -> Option<NewBooking> {
        let booking_type = self.booking_type.clone()?;
        Some(NewBooking {
            user_id: user_id.to_string(),
            date: self.date?,
            time: self.time?,
            reason: format!("{booking_type} (via chatbot)"),
            booking_type,
        })
    }
}

/// One conversation's booking dialogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSession {
    pub(crate) slots: BookingSlots,
    pub(crate) state: BookingState,
    pub(crate) booking_id: Option<BookingId>,
}

impl BookingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> &BookingSlots {
        &self.slots
    }

    pub fn state(&self) -> BookingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn awaiting_field(&self) -> Option<AwaitingField> {
        self.state.awaiting_field()
    }

    /// Identifier of the committed booking. Cleared again when the session
    /// resets after the commit turn.
    pub fn booking_id(&self) -> Option<BookingId> {
        self.booking_id
    }

    /// Whether the awaited field agrees with the slots collected so far.
    pub fn is_consistent(&self) -> bool {
        match self.state.awaiting_field() {
            None => self.slots == BookingSlots::default() && self.booking_id.is_none(),
            Some(AwaitingField::Confirm) => self.slots.first_missing().is_none(),
            Some(field) => self.slots.first_missing() == Some(field),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
