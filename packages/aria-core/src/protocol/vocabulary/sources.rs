//! Source (input) command vocabulary: name queries and name writes.
//!
//! The name form is symmetric: the set request, the success response, and
//! the unsolicited notification all share the `NI` record.

use crate::model::types::Name;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;

pub static QUERY_REQUEST: Pattern = Pattern::new("source query", r"^QI(\d+)$", 2);
pub static NAME_RESPONSE: Pattern = Pattern::new("source name", r"^NI(\d+),(.+)$", 3);

pub fn query_request(source: u8) -> Record {
    Record::from(format!("QI{source}"))
}

pub fn name_response(source: u8, name: &Name) -> Record {
    Record::from(format!("NI{source},{name}"))
}

#[cfg(test)]
pub(crate) fn all_patterns() -> Vec<&'static Pattern> {
    vec![&QUERY_REQUEST, &NAME_RESPONSE]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::vocabulary::{capture_str, capture_u32};

    #[test]
    fn name_form_round_trips() {
        let name = Name::new("Turntable").unwrap();
        let record = name_response(3, &name);
        let captures = NAME_RESPONSE.matches(record.body_str().unwrap()).unwrap();
        assert_eq!(capture_u32(&captures, 1).unwrap(), 3);
        assert_eq!(capture_str(&captures, 2).unwrap(), "Turntable");
    }
}
