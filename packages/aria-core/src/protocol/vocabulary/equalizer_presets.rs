//! Equalizer preset command vocabulary.
//!
//! Preset band records share the `EQB` form with zone bands; inside an
//! exchange the bundle's part table resolves which family the record belongs
//! to. The preset query response leads with the name record so one query
//! initializes the whole preset model.

use crate::model::types::Name;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;

pub static QUERY_REQUEST: Pattern = Pattern::new("equalizer preset query", r"^QEP(\d+)$", 2);
pub static NAME_RESPONSE: Pattern =
    Pattern::new("equalizer preset name", r"^NEP(\d+),(.+)$", 3);
pub static SET_BAND_REQUEST: Pattern =
    Pattern::new("equalizer preset set-band", r"^EPB(\d+),(\d+),(-?\d+)$", 4);
pub static BAND_UP_REQUEST: Pattern =
    Pattern::new("equalizer preset band-up", r"^EPU(\d+),(\d+)$", 3);
pub static BAND_DOWN_REQUEST: Pattern =
    Pattern::new("equalizer preset band-down", r"^EPD(\d+),(\d+)$", 3);

pub fn query_request(preset: u8) -> Record {
    Record::from(format!("QEP{preset}"))
}

pub fn name_response(preset: u8, name: &Name) -> Record {
    Record::from(format!("NEP{preset},{name}"))
}

#[cfg(test)]
pub(crate) fn all_patterns() -> Vec<&'static Pattern> {
    vec![
        &QUERY_REQUEST,
        &NAME_RESPONSE,
        &SET_BAND_REQUEST,
        &BAND_UP_REQUEST,
        &BAND_DOWN_REQUEST,
    ]
}
