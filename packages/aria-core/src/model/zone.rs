//! Per-zone state: name, volume, mute, source, balance, tone, sound mode,
//! equalizer, and crossover settings.

use crate::error::{ModelError, ModelResult};
use crate::model::types::{
    BalanceLevel, BandLevel, CrossoverFrequency, Name, SoundMode, ToneLevel, VolumeLevel,
    EQUALIZER_BAND_IDENTIFIERS, EQUALIZER_BANDS_MAX, EQUALIZER_PRESET_IDENTIFIERS,
    SOURCE_IDENTIFIERS,
};
use crate::model::{set_slot, Change};

/// State mirror for a single zone.
///
/// Every attribute starts uninitialized and is populated by the refresh wave
/// or by observed notifications. Observation synthesis fails with
/// *not-initialized* until the fields it needs have been seen at least once.
#[derive(Debug, Clone)]
pub struct ZoneModel {
    identifier: u8,
    name: Option<Name>,
    volume: Option<VolumeLevel>,
    volume_fixed: Option<bool>,
    mute: Option<bool>,
    source: Option<u8>,
    balance: Option<BalanceLevel>,
    bass: Option<ToneLevel>,
    treble: Option<ToneLevel>,
    sound_mode: Option<SoundMode>,
    bands: [Option<BandLevel>; EQUALIZER_BANDS_MAX as usize],
    equalizer_preset: Option<u8>,
    highpass: Option<CrossoverFrequency>,
    lowpass: Option<CrossoverFrequency>,
}

impl ZoneModel {
    /// Creates the default (uninitialized) model for `identifier`.
    pub fn new(identifier: u8) -> Self {
        Self {
            identifier,
            name: None,
            volume: None,
            volume_fixed: None,
            mute: None,
            source: None,
            balance: None,
            bass: None,
            treble: None,
            sound_mode: None,
            bands: [None; EQUALIZER_BANDS_MAX as usize],
            equalizer_preset: None,
            highpass: None,
            lowpass: None,
        }
    }

    /// The zone identifier this model mirrors.
    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observations
    // ─────────────────────────────────────────────────────────────────────

    pub fn name(&self) -> ModelResult<&Name> {
        self.name.as_ref().ok_or(ModelError::NotInitialized("zone name"))
    }

    pub fn volume(&self) -> ModelResult<VolumeLevel> {
        self.volume.ok_or(ModelError::NotInitialized("zone volume"))
    }

    pub fn volume_fixed(&self) -> ModelResult<bool> {
        self.volume_fixed
            .ok_or(ModelError::NotInitialized("zone volume-fixed"))
    }

    pub fn mute(&self) -> ModelResult<bool> {
        self.mute.ok_or(ModelError::NotInitialized("zone mute"))
    }

    pub fn source(&self) -> ModelResult<u8> {
        self.source.ok_or(ModelError::NotInitialized("zone source"))
    }

    pub fn balance(&self) -> ModelResult<BalanceLevel> {
        self.balance.ok_or(ModelError::NotInitialized("zone balance"))
    }

    /// Bass level, or the flat default when the field has never been seen.
    ///
    /// The combined set-tone path substitutes flat for whichever tone field
    /// the request leaves implicit.
    pub fn bass_or_flat(&self) -> ToneLevel {
        self.bass.unwrap_or(ToneLevel::flat())
    }

    /// Treble level, or the flat default when the field has never been seen.
    pub fn treble_or_flat(&self) -> ToneLevel {
        self.treble.unwrap_or(ToneLevel::flat())
    }

    pub fn tone(&self) -> ModelResult<(ToneLevel, ToneLevel)> {
        match (self.bass, self.treble) {
            (Some(bass), Some(treble)) => Ok((bass, treble)),
            _ => Err(ModelError::NotInitialized("zone tone")),
        }
    }

    pub fn sound_mode(&self) -> ModelResult<SoundMode> {
        self.sound_mode
            .ok_or(ModelError::NotInitialized("zone sound mode"))
    }

    pub fn equalizer_band(&self, band: u8) -> ModelResult<BandLevel> {
        let band = EQUALIZER_BAND_IDENTIFIERS.validate(u32::from(band))?;
        self.bands[usize::from(band) - 1]
            .ok_or(ModelError::NotInitialized("zone equalizer band"))
    }

    pub fn equalizer_preset(&self) -> ModelResult<u8> {
        self.equalizer_preset
            .ok_or(ModelError::NotInitialized("zone equalizer preset"))
    }

    pub fn highpass(&self) -> ModelResult<CrossoverFrequency> {
        self.highpass
            .ok_or(ModelError::NotInitialized("zone highpass crossover"))
    }

    pub fn lowpass(&self) -> ModelResult<CrossoverFrequency> {
        self.lowpass
            .ok_or(ModelError::NotInitialized("zone lowpass crossover"))
    }

    /// True once every field a full zone snapshot needs has been seen.
    pub fn is_initialized(&self) -> bool {
        self.name.is_some()
            && self.volume.is_some()
            && self.volume_fixed.is_some()
            && self.mute.is_some()
            && self.source.is_some()
            && self.balance.is_some()
            && self.bass.is_some()
            && self.treble.is_some()
            && self.sound_mode.is_some()
            && self.bands.iter().all(Option::is_some)
            && self.equalizer_preset.is_some()
            && self.highpass.is_some()
            && self.lowpass.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_name(&mut self, name: Name) -> Change {
        set_slot(&mut self.name, name)
    }

    pub fn set_volume(&mut self, volume: VolumeLevel) -> Change {
        set_slot(&mut self.volume, volume)
    }

    pub fn set_volume_fixed(&mut self, fixed: bool) -> Change {
        set_slot(&mut self.volume_fixed, fixed)
    }

    pub fn set_mute(&mut self, mute: bool) -> Change {
        set_slot(&mut self.mute, mute)
    }

    /// Validates and stores the source this zone plays.
    pub fn set_source(&mut self, source: u8) -> ModelResult<Change> {
        let source = SOURCE_IDENTIFIERS.validate(u32::from(source))?;
        Ok(set_slot(&mut self.source, source))
    }

    pub fn set_balance(&mut self, balance: BalanceLevel) -> Change {
        set_slot(&mut self.balance, balance)
    }

    /// Stores both tone fields; changed if either moved.
    pub fn set_tone(&mut self, bass: ToneLevel, treble: ToneLevel) -> Change {
        let bass_change = set_slot(&mut self.bass, bass);
        let treble_change = set_slot(&mut self.treble, treble);
        if bass_change.is_changed() || treble_change.is_changed() {
            Change::Changed
        } else {
            Change::AlreadySet
        }
    }

    pub fn set_sound_mode(&mut self, mode: SoundMode) -> Change {
        set_slot(&mut self.sound_mode, mode)
    }

    pub fn set_equalizer_band(&mut self, band: u8, level: BandLevel) -> ModelResult<Change> {
        let band = EQUALIZER_BAND_IDENTIFIERS.validate(u32::from(band))?;
        Ok(set_slot(&mut self.bands[usize::from(band) - 1], level))
    }

    pub fn set_equalizer_preset(&mut self, preset: u8) -> ModelResult<Change> {
        let preset = EQUALIZER_PRESET_IDENTIFIERS.validate(u32::from(preset))?;
        Ok(set_slot(&mut self.equalizer_preset, preset))
    }

    pub fn set_highpass(&mut self, frequency: CrossoverFrequency) -> Change {
        set_slot(&mut self.highpass, frequency)
    }

    pub fn set_lowpass(&mut self, frequency: CrossoverFrequency) -> Change {
        set_slot(&mut self.lowpass, frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> ZoneModel {
        ZoneModel::new(3)
    }

    #[test]
    fn observations_fail_until_first_write() {
        let mut zone = zone();
        assert!(zone.volume().is_err());
        zone.set_volume(VolumeLevel::new(-20).unwrap());
        assert_eq!(zone.volume().unwrap().get(), -20);
    }

    #[test]
    fn repeated_set_reports_already_set() {
        let mut zone = zone();
        assert!(zone.set_mute(true).is_changed());
        assert!(!zone.set_mute(true).is_changed());
        assert!(zone.set_mute(false).is_changed());
    }

    #[test]
    fn tone_changes_when_either_field_moves() {
        let mut zone = zone();
        let flat = ToneLevel::flat();
        let boost = ToneLevel::new(4).unwrap();
        assert!(zone.set_tone(flat, flat).is_changed());
        assert!(!zone.set_tone(flat, flat).is_changed());
        assert!(zone.set_tone(flat, boost).is_changed());
    }

    #[test]
    fn source_is_validated_before_storage() {
        let mut zone = zone();
        assert!(zone.set_source(0).is_err());
        assert!(zone.set_source(9).is_err());
        assert!(zone.set_source(8).unwrap().is_changed());
        assert!(zone.source().is_ok());
    }

    #[test]
    fn initialized_requires_every_snapshot_field() {
        let mut zone = zone();
        zone.set_name(Name::new("Patio").unwrap());
        zone.set_volume(VolumeLevel::new(-30).unwrap());
        zone.set_volume_fixed(false);
        zone.set_mute(false);
        zone.set_source(1).unwrap();
        zone.set_balance(BalanceLevel::flat());
        zone.set_tone(ToneLevel::flat(), ToneLevel::flat());
        zone.set_sound_mode(SoundMode::Tone);
        zone.set_equalizer_preset(1).unwrap();
        zone.set_highpass(CrossoverFrequency::new(100).unwrap());
        zone.set_lowpass(CrossoverFrequency::new(10_000).unwrap());
        assert!(!zone.is_initialized());

        for band in 1..=EQUALIZER_BANDS_MAX {
            zone.set_equalizer_band(band, BandLevel::flat()).unwrap();
        }
        assert!(zone.is_initialized());
    }

    #[test]
    fn tone_defaults_substitute_flat() {
        let zone = zone();
        assert_eq!(zone.bass_or_flat(), ToneLevel::flat());
        assert_eq!(zone.treble_or_flat(), ToneLevel::flat());
        assert!(zone.tone().is_err());
    }
}
