//! Zone command vocabulary.
//!
//! Zone mutations are forwarded verbatim upstream; their responses share the
//! unsolicited notification forms. Observations complete with an echo of the
//! query record after the relevant state records.

use crate::error::ModelResult;
use crate::model::types::{
    BalanceLevel, BandLevel, CrossoverFrequency, Name, SoundMode, ToneLevel, VolumeLevel,
};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;

// ─────────────────────────────────────────────────────────────────────────────
// Request patterns
// ─────────────────────────────────────────────────────────────────────────────

pub static QUERY_REQUEST: Pattern = Pattern::new("zone query", r"^QO(\d+)$", 2);
pub static QUERY_VOLUME_REQUEST: Pattern = Pattern::new("zone query-volume", r"^QV(\d+)$", 2);
pub static QUERY_MUTE_REQUEST: Pattern = Pattern::new("zone query-mute", r"^QM(\d+)$", 2);
pub static QUERY_SOURCE_REQUEST: Pattern = Pattern::new("zone query-source", r"^QS(\d+)$", 2);

pub static SET_VOLUME_REQUEST: Pattern = Pattern::new("zone set-volume", r"^VZ(\d+),(-?\d+)$", 3);
pub static VOLUME_UP_REQUEST: Pattern = Pattern::new("zone volume-up", r"^VU(\d+)$", 2);
pub static VOLUME_DOWN_REQUEST: Pattern = Pattern::new("zone volume-down", r"^VD(\d+)$", 2);
pub static SET_VOLUME_ALL_REQUEST: Pattern =
    Pattern::new("zone set-volume-all", r"^VA(-?\d+)$", 2);
pub static SET_VOLUME_FIXED_REQUEST: Pattern =
    Pattern::new("zone set-volume-fixed", r"^VF(\d+),([01])$", 3);

pub static MUTE_REQUEST: Pattern = Pattern::new("zone mute", r"^MZ(\d+)$", 2);
pub static UNMUTE_REQUEST: Pattern = Pattern::new("zone unmute", r"^MU(\d+)$", 2);
pub static TOGGLE_MUTE_REQUEST: Pattern = Pattern::new("zone toggle-mute", r"^MT(\d+)$", 2);

pub static SET_SOURCE_REQUEST: Pattern = Pattern::new("zone set-source", r"^CZ(\d+),(\d+)$", 3);
pub static SET_SOURCE_ALL_REQUEST: Pattern = Pattern::new("zone set-source-all", r"^CA(\d+)$", 2);

pub static SET_BALANCE_REQUEST: Pattern =
    Pattern::new("zone set-balance", r"^BZ(\d+),([LR])(\d+)$", 4);
pub static ADJUST_BALANCE_REQUEST: Pattern =
    Pattern::new("zone adjust-balance", r"^BZ(\d+),([LR])$", 3);

pub static SET_TONE_REQUEST: Pattern =
    Pattern::new("zone set-tone", r"^TZ(\d+),(-?\d+),(-?\d+)$", 4);
pub static SET_BASS_REQUEST: Pattern = Pattern::new("zone set-bass", r"^SB(\d+),(-?\d+)$", 3);
pub static SET_TREBLE_REQUEST: Pattern = Pattern::new("zone set-treble", r"^ST(\d+),(-?\d+)$", 3);
pub static BASS_UP_REQUEST: Pattern = Pattern::new("zone bass-up", r"^BU(\d+)$", 2);
pub static BASS_DOWN_REQUEST: Pattern = Pattern::new("zone bass-down", r"^BD(\d+)$", 2);
pub static TREBLE_UP_REQUEST: Pattern = Pattern::new("zone treble-up", r"^TU(\d+)$", 2);
pub static TREBLE_DOWN_REQUEST: Pattern = Pattern::new("zone treble-down", r"^TD(\d+)$", 2);

pub static SET_EQUALIZER_BAND_REQUEST: Pattern =
    Pattern::new("zone set-equalizer-band", r"^EZ(\d+),(\d+),(-?\d+)$", 4);
pub static EQUALIZER_BAND_UP_REQUEST: Pattern =
    Pattern::new("zone equalizer-band-up", r"^EU(\d+),(\d+)$", 3);
pub static EQUALIZER_BAND_DOWN_REQUEST: Pattern =
    Pattern::new("zone equalizer-band-down", r"^ED(\d+),(\d+)$", 3);
pub static SET_EQUALIZER_PRESET_REQUEST: Pattern =
    Pattern::new("zone set-equalizer-preset", r"^ZP(\d+),(\d+)$", 3);

pub static SET_SOUND_MODE_REQUEST: Pattern =
    Pattern::new("zone set-sound-mode", r"^SM(\d+),(\d+)$", 3);
pub static SET_HIGHPASS_REQUEST: Pattern = Pattern::new("zone set-highpass", r"^HP(\d+),(\d+)$", 3);
pub static SET_LOWPASS_REQUEST: Pattern = Pattern::new("zone set-lowpass", r"^LP(\d+),(\d+)$", 3);

pub static SET_NAME_REQUEST: Pattern = Pattern::new("zone set-name", r"^NZ(\d+),(.+)$", 3);

// ─────────────────────────────────────────────────────────────────────────────
// Response / notification patterns
// ─────────────────────────────────────────────────────────────────────────────

pub static NAME_RESPONSE: Pattern = Pattern::new("zone name", r"^NZ(\d+),(.+)$", 3);
pub static SOURCE_RESPONSE: Pattern = Pattern::new("zone source", r"^CHN(\d+),(\d+)$", 3);
pub static SOURCE_ALL_RESPONSE: Pattern = Pattern::new("zone source-all", r"^CHNA(\d+)$", 2);
pub static VOLUME_RESPONSE: Pattern = Pattern::new("zone volume", r"^VOL(\d+),(-?\d+)$", 3);
pub static VOLUME_ALL_RESPONSE: Pattern = Pattern::new("zone volume-all", r"^VOLA(-?\d+)$", 2);
pub static VOLUME_FIXED_RESPONSE: Pattern =
    Pattern::new("zone volume-fixed", r"^VOLF(\d+),([01])$", 3);
pub static MUTE_RESPONSE: Pattern = Pattern::new("zone mute state", r"^MUTE([01])(\d+)$", 3);
pub static SOUND_MODE_RESPONSE: Pattern = Pattern::new("zone sound mode", r"^MODE(\d+),(\d+)$", 3);
pub static EQUALIZER_BAND_RESPONSE: Pattern =
    Pattern::new("equalizer band level", r"^EQB(\d+),(\d+),(-?\d+)$", 4);
pub static EQUALIZER_PRESET_RESPONSE: Pattern =
    Pattern::new("zone equalizer preset", r"^EQP(\d+),(\d+)$", 3);
pub static TONE_RESPONSE: Pattern = Pattern::new("zone tone", r"^TON(\d+),(-?\d+),(-?\d+)$", 4);
pub static HIGHPASS_RESPONSE: Pattern =
    Pattern::new("zone highpass crossover", r"^HPF(\d+),(\d+)$", 3);
pub static LOWPASS_RESPONSE: Pattern =
    Pattern::new("zone lowpass crossover", r"^LPF(\d+),(\d+)$", 3);
pub static BALANCE_RESPONSE: Pattern =
    Pattern::new("zone balance", r"^BAL(\d+),([LR])(\d+)$", 4);

// ─────────────────────────────────────────────────────────────────────────────
// Formatters
// ─────────────────────────────────────────────────────────────────────────────

pub fn query_request(zone: u8) -> Record {
    Record::from(format!("QO{zone}"))
}

pub fn set_volume_request(zone: u8, volume: VolumeLevel) -> Record {
    Record::from(format!("VZ{zone},{volume}"))
}

pub fn volume_up_request(zone: u8) -> Record {
    Record::from(format!("VU{zone}"))
}

pub fn volume_down_request(zone: u8) -> Record {
    Record::from(format!("VD{zone}"))
}

pub fn mute_request(zone: u8) -> Record {
    Record::from(format!("MZ{zone}"))
}

pub fn unmute_request(zone: u8) -> Record {
    Record::from(format!("MU{zone}"))
}

pub fn toggle_mute_request(zone: u8) -> Record {
    Record::from(format!("MT{zone}"))
}

pub fn set_source_request(zone: u8, source: u8) -> Record {
    Record::from(format!("CZ{zone},{source}"))
}

/// The combined tone request the device requires in place of standalone bass
/// or treble mutations.
pub fn set_tone_request(zone: u8, bass: ToneLevel, treble: ToneLevel) -> Record {
    Record::from(format!("TZ{zone},{bass},{treble}"))
}

pub fn name_response(zone: u8, name: &Name) -> Record {
    Record::from(format!("NZ{zone},{name}"))
}

pub fn source_response(zone: u8, source: u8) -> Record {
    Record::from(format!("CHN{zone},{source}"))
}

pub fn source_all_response(source: u8) -> Record {
    Record::from(format!("CHNA{source}"))
}

pub fn volume_response(zone: u8, volume: VolumeLevel) -> Record {
    Record::from(format!("VOL{zone},{volume}"))
}

pub fn volume_all_response(volume: VolumeLevel) -> Record {
    Record::from(format!("VOLA{volume}"))
}

pub fn volume_fixed_response(zone: u8, fixed: bool) -> Record {
    Record::from(format!("VOLF{zone},{}", u8::from(fixed)))
}

/// Mute notifications carry the state digit ahead of the zone identifier.
pub fn mute_response(zone: u8, muted: bool) -> Record {
    Record::from(format!("MUTE{}{zone}", u8::from(muted)))
}

pub fn sound_mode_response(zone: u8, mode: SoundMode) -> Record {
    Record::from(format!("MODE{zone},{}", mode.to_wire()))
}

pub fn equalizer_band_response(identifier: u8, band: u8, level: BandLevel) -> Record {
    Record::from(format!("EQB{identifier},{band},{level}"))
}

pub fn equalizer_preset_response(zone: u8, preset: u8) -> Record {
    Record::from(format!("EQP{zone},{preset}"))
}

pub fn tone_response(zone: u8, bass: ToneLevel, treble: ToneLevel) -> Record {
    Record::from(format!("TON{zone},{bass},{treble}"))
}

pub fn highpass_response(zone: u8, frequency: CrossoverFrequency) -> Record {
    Record::from(format!("HPF{zone},{frequency}"))
}

pub fn lowpass_response(zone: u8, frequency: CrossoverFrequency) -> Record {
    Record::from(format!("LPF{zone},{frequency}"))
}

pub fn balance_response(zone: u8, balance: BalanceLevel) -> Record {
    let (side, magnitude) = balance_to_wire(balance);
    Record::from(format!("BAL{zone},{side}{magnitude}"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Balance encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Converts a signed balance into the channel-letter wire form.
///
/// Center is right-tagged: `0` formats as `R0`.
pub fn balance_to_wire(balance: BalanceLevel) -> (char, i16) {
    let raw = balance.get();
    if raw < 0 {
        ('L', -raw)
    } else {
        ('R', raw)
    }
}

/// Converts the channel-letter wire form into a signed balance.
pub fn balance_from_wire(side: &str, magnitude: i16) -> ModelResult<BalanceLevel> {
    match side {
        "L" => BalanceLevel::new(-magnitude),
        _ => BalanceLevel::new(magnitude),
    }
}

#[cfg(test)]
pub(crate) fn all_patterns() -> Vec<&'static Pattern> {
    vec![
        &QUERY_REQUEST,
        &QUERY_VOLUME_REQUEST,
        &QUERY_MUTE_REQUEST,
        &QUERY_SOURCE_REQUEST,
        &SET_VOLUME_REQUEST,
        &VOLUME_UP_REQUEST,
        &VOLUME_DOWN_REQUEST,
        &SET_VOLUME_ALL_REQUEST,
        &SET_VOLUME_FIXED_REQUEST,
        &MUTE_REQUEST,
        &UNMUTE_REQUEST,
        &TOGGLE_MUTE_REQUEST,
        &SET_SOURCE_REQUEST,
        &SET_SOURCE_ALL_REQUEST,
        &SET_BALANCE_REQUEST,
        &ADJUST_BALANCE_REQUEST,
        &SET_TONE_REQUEST,
        &SET_BASS_REQUEST,
        &SET_TREBLE_REQUEST,
        &BASS_UP_REQUEST,
        &BASS_DOWN_REQUEST,
        &TREBLE_UP_REQUEST,
        &TREBLE_DOWN_REQUEST,
        &SET_EQUALIZER_BAND_REQUEST,
        &EQUALIZER_BAND_UP_REQUEST,
        &EQUALIZER_BAND_DOWN_REQUEST,
        &SET_EQUALIZER_PRESET_REQUEST,
        &SET_SOUND_MODE_REQUEST,
        &SET_HIGHPASS_REQUEST,
        &SET_LOWPASS_REQUEST,
        &SET_NAME_REQUEST,
        &NAME_RESPONSE,
        &SOURCE_RESPONSE,
        &SOURCE_ALL_RESPONSE,
        &VOLUME_RESPONSE,
        &VOLUME_ALL_RESPONSE,
        &VOLUME_FIXED_RESPONSE,
        &MUTE_RESPONSE,
        &SOUND_MODE_RESPONSE,
        &EQUALIZER_BAND_RESPONSE,
        &EQUALIZER_PRESET_RESPONSE,
        &TONE_RESPONSE,
        &HIGHPASS_RESPONSE,
        &LOWPASS_RESPONSE,
        &BALANCE_RESPONSE,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::vocabulary::{capture_i16, capture_str, capture_u32};

    #[test]
    fn set_and_adjust_balance_do_not_shadow_each_other() {
        assert!(SET_BALANCE_REQUEST.matches("BZ3,L40").is_some());
        assert!(SET_BALANCE_REQUEST.matches("BZ3,L").is_none());
        assert!(ADJUST_BALANCE_REQUEST.matches("BZ3,L").is_some());
        assert!(ADJUST_BALANCE_REQUEST.matches("BZ3,L40").is_none());
    }

    #[test]
    fn volume_variants_do_not_overlap() {
        assert!(VOLUME_RESPONSE.matches("VOLA-10").is_none());
        assert!(VOLUME_RESPONSE.matches("VOLF1,0").is_none());
        assert!(VOLUME_ALL_RESPONSE.matches("VOLA-10").is_some());
        assert!(VOLUME_FIXED_RESPONSE.matches("VOLF1,0").is_some());
    }

    #[test]
    fn mute_state_digit_precedes_the_zone() {
        let record = mute_response(13, true);
        assert_eq!(record.body_str(), Some("MUTE113"));
        let captures = MUTE_RESPONSE.matches("MUTE113").unwrap();
        assert_eq!(capture_str(&captures, 1).unwrap(), "1");
        assert_eq!(capture_u32(&captures, 2).unwrap(), 13);
    }

    #[test]
    fn balance_wire_form_is_side_tagged() {
        let left = BalanceLevel::new(-40).unwrap();
        assert_eq!(balance_response(3, left).body_str(), Some("BAL3,L40"));
        let right = BalanceLevel::new(25).unwrap();
        assert_eq!(balance_response(3, right).body_str(), Some("BAL3,R25"));
        let center = BalanceLevel::flat();
        assert_eq!(balance_response(3, center).body_str(), Some("BAL3,R0"));
    }

    #[test]
    fn balance_wire_form_round_trips() {
        for raw in [-80, -40, 0, 25, 80] {
            let balance = BalanceLevel::new(raw).unwrap();
            let (side, magnitude) = balance_to_wire(balance);
            let parsed = balance_from_wire(&side.to_string(), magnitude).unwrap();
            assert_eq!(parsed, balance);
        }
    }

    #[test]
    fn tone_response_parses_signed_levels() {
        let record = tone_response(
            4,
            ToneLevel::new(-5).unwrap(),
            ToneLevel::new(10).unwrap(),
        );
        assert_eq!(record.body_str(), Some("TON4,-5,10"));
        let captures = TONE_RESPONSE.matches("TON4,-5,10").unwrap();
        assert_eq!(capture_i16(&captures, 2).unwrap(), -5);
        assert_eq!(capture_i16(&captures, 3).unwrap(), 10);
    }

    #[test]
    fn name_request_accepts_embedded_commas() {
        let captures = SET_NAME_REQUEST.matches("NZ2,Den, Main").unwrap();
        assert_eq!(capture_u32(&captures, 1).unwrap(), 2);
        assert_eq!(capture_str(&captures, 2).unwrap(), "Den, Main");
    }
}
