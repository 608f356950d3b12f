//! Deciding what a patient message is about.

use clinic_booking::is_booking_intent;

/// Phrases that indicate a patient may need urgent care.
pub const EMERGENCY_KEYWORDS: [&str; 11] = [
    "bleeding a lot",
    "cannot stop bleeding",
    "severe bleeding",
    "difficulty breathing",
    "can't breathe",
    "jaw fracture",
    "broken jaw",
    "unconscious",
    "swelling spreading",
    "severe trauma",
    "high fever",
];

pub const EMERGENCY_RESPONSE: &str = "**This may be an emergency.**\n\n\
    I am not a substitute for a dentist or emergency care.\n\
    Please **go to the nearest emergency department** or **call emergency services immediately.**";

pub fn is_emergency(text: &str) -> bool {
    let lowered = text.to_lowercase();
    EMERGENCY_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Where the router sends a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Emergency,
    Booking,
    Question,
}

/// Classifies `text`. Emergencies take precedence over an ongoing booking,
/// and an ongoing booking takes every other message.
pub fn route(text: &str, booking_active: bool) -> Route {
    if is_emergency(text) {
        Route::Emergency
    } else if booking_active || is_booking_intent(text) {
        Route::Booking
    } else {
        Route::Question
    }
}
