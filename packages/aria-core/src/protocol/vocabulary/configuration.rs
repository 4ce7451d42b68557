//! Configuration dump vocabulary.

use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;

pub static QUERY_REQUEST: Pattern = Pattern::new("configuration query", r"^QX$", 1);

pub fn query_request() -> Record {
    Record::from("QX")
}

pub fn query_complete() -> Record {
    Record::from("QX")
}

#[cfg(test)]
pub(crate) fn all_patterns() -> Vec<&'static Pattern> {
    vec![&QUERY_REQUEST]
}
