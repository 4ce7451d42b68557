//! Group command vocabulary.
//!
//! Groups are local aggregates: membership and name requests are answered
//! from local state, and the volume/mute/source family is echoed to the
//! requester while the zones controller fans the intent out to the members.
//! Mute requests use the `M`/`U` character forms rather than the `0`/`1`
//! digits the zone notifications carry.

use crate::model::types::{Name, VolumeLevel};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;

// ─────────────────────────────────────────────────────────────────────────────
// Request patterns
// ─────────────────────────────────────────────────────────────────────────────

pub static QUERY_REQUEST: Pattern = Pattern::new("group query", r"^QG(\d+)$", 2);
pub static SET_NAME_REQUEST: Pattern = Pattern::new("group set-name", r"^NG(\d+),(.+)$", 3);

pub static ADD_ZONE_REQUEST: Pattern = Pattern::new("group add-zone", r"^GA(\d+),(\d+)$", 3);
pub static REMOVE_ZONE_REQUEST: Pattern = Pattern::new("group remove-zone", r"^GR(\d+),(\d+)$", 3);
pub static CLEAR_ZONES_REQUEST: Pattern = Pattern::new("group clear-zones", r"^GC(\d+)$", 2);

pub static SET_VOLUME_REQUEST: Pattern = Pattern::new("group set-volume", r"^VG(\d+),(-?\d+)$", 3);
pub static VOLUME_UP_REQUEST: Pattern = Pattern::new("group volume-up", r"^VGU(\d+)$", 2);
pub static VOLUME_DOWN_REQUEST: Pattern = Pattern::new("group volume-down", r"^VGD(\d+)$", 2);
pub static SET_MUTE_REQUEST: Pattern = Pattern::new("group set-mute", r"^MG(\d+),([MU])$", 3);
pub static TOGGLE_MUTE_REQUEST: Pattern = Pattern::new("group toggle-mute", r"^MTG(\d+)$", 2);
pub static SET_SOURCE_REQUEST: Pattern = Pattern::new("group set-source", r"^SG(\d+),(\d+)$", 3);

// ─────────────────────────────────────────────────────────────────────────────
// Formatters
// ─────────────────────────────────────────────────────────────────────────────

pub fn query_complete(group: u8) -> Record {
    Record::from(format!("QG{group}"))
}

pub fn name_response(group: u8, name: &Name) -> Record {
    Record::from(format!("NG{group},{name}"))
}

pub fn add_zone_response(group: u8, zone: u8) -> Record {
    Record::from(format!("GRA{group},{zone}"))
}

pub fn remove_zone_response(group: u8, zone: u8) -> Record {
    Record::from(format!("GRR{group},{zone}"))
}

pub fn clear_zones_response(group: u8) -> Record {
    Record::from(format!("GRC{group}"))
}

pub fn set_volume_response(group: u8, volume: VolumeLevel) -> Record {
    Record::from(format!("VG{group},{volume}"))
}

pub fn volume_up_response(group: u8) -> Record {
    Record::from(format!("VGU{group}"))
}

pub fn volume_down_response(group: u8) -> Record {
    Record::from(format!("VGD{group}"))
}

pub fn set_mute_response(group: u8, muted: bool) -> Record {
    Record::from(format!("MG{group},{}", if muted { 'M' } else { 'U' }))
}

pub fn toggle_mute_response(group: u8) -> Record {
    Record::from(format!("MTG{group}"))
}

pub fn set_source_response(group: u8, source: u8) -> Record {
    Record::from(format!("SG{group},{source}"))
}

#[cfg(test)]
pub(crate) fn all_patterns() -> Vec<&'static Pattern> {
    vec![
        &QUERY_REQUEST,
        &SET_NAME_REQUEST,
        &ADD_ZONE_REQUEST,
        &REMOVE_ZONE_REQUEST,
        &CLEAR_ZONES_REQUEST,
        &SET_VOLUME_REQUEST,
        &VOLUME_UP_REQUEST,
        &VOLUME_DOWN_REQUEST,
        &SET_MUTE_REQUEST,
        &TOGGLE_MUTE_REQUEST,
        &SET_SOURCE_REQUEST,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::vocabulary::capture_str;

    #[test]
    fn group_and_zone_mute_requests_are_distinct() {
        assert!(SET_MUTE_REQUEST.matches("MG2,M").is_some());
        assert!(SET_MUTE_REQUEST.matches("MG2,0").is_none());
        assert!(TOGGLE_MUTE_REQUEST.matches("MTG2").is_some());
        assert!(TOGGLE_MUTE_REQUEST.matches("MT2").is_none());
    }

    #[test]
    fn volume_adjust_forms_do_not_shadow_set() {
        assert!(SET_VOLUME_REQUEST.matches("VG2,10").is_some());
        assert!(SET_VOLUME_REQUEST.matches("VGU2").is_none());
        assert!(VOLUME_UP_REQUEST.matches("VGU2").is_some());
    }

    #[test]
    fn mute_echo_uses_character_states() {
        assert_eq!(set_mute_response(2, true).body_str(), Some("MG2,M"));
        assert_eq!(set_mute_response(2, false).body_str(), Some("MG2,U"));
        let captures = SET_MUTE_REQUEST.matches("MG2,U").unwrap();
        assert_eq!(capture_str(&captures, 2).unwrap(), "U");
    }

    #[test]
    fn membership_responses_are_distinct_from_requests() {
        assert!(REMOVE_ZONE_REQUEST.matches("GRA2,1").is_none());
        assert_eq!(add_zone_response(2, 1).body_str(), Some("GRA2,1"));
        assert_eq!(clear_zones_response(9).body_str(), Some("GRC9"));
    }
}
