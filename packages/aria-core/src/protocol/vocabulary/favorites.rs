//! Favorite command vocabulary: name queries and name writes.

use crate::model::types::Name;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;

pub static QUERY_REQUEST: Pattern = Pattern::new("favorite query", r"^QC(\d+)$", 2);
pub static NAME_RESPONSE: Pattern = Pattern::new("favorite name", r"^NC(\d+),(.+)$", 3);

pub fn query_request(favorite: u8) -> Record {
    Record::from(format!("QC{favorite}"))
}

pub fn name_response(favorite: u8, name: &Name) -> Record {
    Record::from(format!("NC{favorite},{name}"))
}

#[cfg(test)]
pub(crate) fn all_patterns() -> Vec<&'static Pattern> {
    vec![&QUERY_REQUEST, &NAME_RESPONSE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_and_name_forms_are_distinct() {
        assert!(QUERY_REQUEST.matches("QC4").is_some());
        assert!(QUERY_REQUEST.matches("NC4,Jazz").is_none());
        assert!(NAME_RESPONSE.matches("NC4,Jazz").is_some());
        assert_eq!(
            name_response(4, &Name::new("Jazz").unwrap()).body_str(),
            Some("NC4,Jazz")
        );
    }
}
