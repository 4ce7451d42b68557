//! Front panel command vocabulary.
//!
//! Device quirk: the query forms do not echo their own completion token; the
//! state record is the entire response. The proxy accepts and reproduces
//! that form.

use crate::model::types::Brightness;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;

pub static QUERY_BRIGHTNESS_REQUEST: Pattern =
    Pattern::new("front panel query-brightness", r"^QFPB$", 1);
pub static QUERY_LOCKED_REQUEST: Pattern = Pattern::new("front panel query-locked", r"^QFPL$", 1);

/// State form, shared by the set request, response, and notification.
pub static BRIGHTNESS_RESPONSE: Pattern =
    Pattern::new("front panel brightness", r"^FPB(\d+)$", 2);
pub static LOCKED_RESPONSE: Pattern = Pattern::new("front panel locked", r"^FPL([01])$", 2);

pub fn query_brightness_request() -> Record {
    Record::from("QFPB")
}

pub fn query_locked_request() -> Record {
    Record::from("QFPL")
}

pub fn brightness_response(brightness: Brightness) -> Record {
    Record::from(format!("FPB{brightness}"))
}

pub fn locked_response(locked: bool) -> Record {
    Record::from(format!("FPL{}", u8::from(locked)))
}

#[cfg(test)]
pub(crate) fn all_patterns() -> Vec<&'static Pattern> {
    vec![
        &QUERY_BRIGHTNESS_REQUEST,
        &QUERY_LOCKED_REQUEST,
        &BRIGHTNESS_RESPONSE,
        &LOCKED_RESPONSE,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_forms_take_no_identifier() {
        assert!(QUERY_BRIGHTNESS_REQUEST.matches("QFPB").is_some());
        assert!(QUERY_BRIGHTNESS_REQUEST.matches("QFPB1").is_none());
        assert!(QUERY_LOCKED_REQUEST.matches("QFPL").is_some());
    }

    #[test]
    fn state_forms_format_and_parse() {
        assert_eq!(
            brightness_response(Brightness::new(2).unwrap()).body_str(),
            Some("FPB2")
        );
        assert!(LOCKED_RESPONSE.matches("FPL1").is_some());
        assert!(LOCKED_RESPONSE.matches("FPL2").is_none());
    }
}
