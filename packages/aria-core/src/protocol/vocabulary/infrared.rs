//! Infrared command vocabulary.
//!
//! Shares the front panel's no-echo query quirk.

use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;

pub static QUERY_REQUEST: Pattern = Pattern::new("infrared query", r"^QIRL$", 1);

/// State form, shared by the set request, response, and notification.
pub static DISABLED_RESPONSE: Pattern = Pattern::new("infrared disabled", r"^IRL([01])$", 2);

pub fn query_request() -> Record {
    Record::from("QIRL")
}

pub fn disabled_response(disabled: bool) -> Record {
    Record::from(format!("IRL{}", u8::from(disabled)))
}

#[cfg(test)]
pub(crate) fn all_patterns() -> Vec<&'static Pattern> {
    vec![&QUERY_REQUEST, &DISABLED_RESPONSE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_form_round_trips() {
        assert_eq!(disabled_response(true).body_str(), Some("IRL1"));
        assert!(DISABLED_RESPONSE.matches("IRL0").is_some());
        assert!(DISABLED_RESPONSE.matches("IRL").is_none());
    }
}
