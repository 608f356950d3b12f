//! Parsing and validation for free-text dialogue answers.

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::error::ParseError;

/// Date layouts accepted from patients, tried in order.
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"];

const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Minimum number of digits in an accepted phone number.
pub const MIN_PHONE_DIGITS: usize = 7;

const BOOKING_KEYWORDS: [&str; 6] = ["book", "appointment", "schedule", "visit", "slot", "consultation"];

const YES_WORDS: [&str; 8] = ["yes", "y", "yeah", "yep", "sure", "ok", "okay", "confirm"];
const NO_WORDS: [&str; 5] = ["no", "n", "nope", "nah", "cancel"];
const CANCEL_WORDS: [&str; 3] = ["cancel", "stop", "exit"];

/// A patient's answer to the confirmation summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
}

/// Whether `text` asks to book an appointment.
pub fn is_booking_intent(text: &str) -> bool {
    let lowered = text.to_lowercase();
    BOOKING_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// Whether `text` is one of the words that abandon a booking at any step.
pub fn is_cancel_keyword(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    CANCEL_WORDS.contains(&lowered.as_str())
}

/// Parses a date in any of [`DATE_FORMATS`].
///
/// ```
/// use chrono::NaiveDate;
/// use clinic_booking::parse_date;
///
/// let expected = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
/// assert_eq!(parse_date("01/03/2025").unwrap(), expected);
/// ```
pub fn parse_date(text: &str) -> Result<NaiveDate, ParseError> {
    let trimmed = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| ParseError::InvalidDate(trimmed.to_string()))
}

/// Parses a 24-hour clock time. Seconds are accepted and dropped.
pub fn parse_time(text: &str) -> Result<NaiveTime, ParseError> {
    let trimmed = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .and_then(|time| time.with_second(0))
        .ok_or_else(|| ParseError::InvalidTime(trimmed.to_string()))
}

/// The booking type as typed, trimmed. Any non-empty text is accepted.
pub fn parse_booking_type(text: &str) -> Result<String, ParseError> {
    let booking_type = text.trim();
    if booking_type.is_empty() {
        return Err(ParseError::EmptyBookingType);
    }
    Ok(booking_type.to_string())
}

/// Keeps only the digits of `text`.
pub fn normalize_phone(text: &str) -> Result<String, ParseError> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(ParseError::InvalidPhone { digits: digits.len(), min_digits: MIN_PHONE_DIGITS });
    }
    Ok(digits)
}

pub fn parse_confirmation(text: &str) -> Result<Confirmation, ParseError> {
    let lowered = text.trim().to_lowercase();
    if YES_WORDS.contains(&lowered.as_str()) {
        Ok(Confirmation::Yes)
    } else if NO_WORDS.contains(&lowered.as_str()) {
        Ok(Confirmation::No)
    } else {
        Err(ParseError::InvalidConfirmation(text.trim().to_string()))
    }
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_date_layouts_agree() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        for input in ["2025-03-01", "01-03-2025", "01/03/2025", "  2025-03-01 "] {
            assert_eq!(parse_date(input).unwrap(), expected, "input {input:?}");
        }
    }

    #[test]
    fn rejects_malformed_dates() {
        for input in ["", "tomorrow", "2025/03/01", "31-02-2025", "2025-13-01"] {
            assert!(matches!(parse_date(input), Err(ParseError::InvalidDate(_))), "input {input:?}");
        }
    }

    #[test]
    fn times_normalise_to_minutes() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(parse_time("09:00").unwrap(), nine);
        assert_eq!(parse_time("09:00:45").unwrap(), nine);
        assert_eq!(format_time(parse_time("17:30:00").unwrap()), "17:30");
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("9am").is_err());
    }

    #[test]
    fn booking_type_must_not_be_blank() {
        assert_eq!(parse_booking_type("  Root canal "), Ok("Root canal".to_string()));
        assert_eq!(parse_booking_type(" \t"), Err(ParseError::EmptyBookingType));
    }

    #[test]
    fn phone_keeps_digits_only() {
        assert_eq!(normalize_phone("+1 (555) 123-4567").unwrap(), "15551234567");
        assert_eq!(
            normalize_phone("12-34"),
            Err(ParseError::InvalidPhone { digits: 4, min_digits: MIN_PHONE_DIGITS })
        );
    }

    #[test]
    fn confirmation_synonyms_are_case_insensitive() {
        for word in ["YES", "y", "Yeah", "ok", "Confirm"] {
            assert_eq!(parse_confirmation(word).unwrap(), Confirmation::Yes);
        }
        for word in ["No", "n", "nah", "CANCEL"] {
            assert_eq!(parse_confirmation(word).unwrap(), Confirmation::No);
        }
        assert!(parse_confirmation("1234567890").is_err());
    }

    #[test]
    fn booking_intent_keywords() {
        assert!(is_booking_intent("I'd like to BOOK a cleaning"));
        assert!(is_booking_intent("any free slot next week?"));
        assert!(!is_booking_intent("Cleaning"));
        assert!(!is_booking_intent("how long does whitening last"));
    }

    #[test]
    fn cancel_keywords_match_whole_message() {
        assert!(is_cancel_keyword(" Stop "));
        assert!(is_cancel_keyword("exit"));
        assert!(!is_cancel_keyword("can I cancel later?"));
    }
}
