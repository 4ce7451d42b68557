//! Equalizer preset state: display name plus a fixed array of band levels.

use crate::error::{ModelError, ModelResult};
use crate::model::types::{BandLevel, Name, EQUALIZER_BAND_IDENTIFIERS, EQUALIZER_BANDS_MAX};
use crate::model::{set_slot, Change};

/// State for a single equalizer preset.
#[derive(Debug, Clone)]
pub struct EqualizerPresetModel {
    identifier: u8,
    name: Option<Name>,
    bands: [Option<BandLevel>; EQUALIZER_BANDS_MAX as usize],
}

impl EqualizerPresetModel {
    pub fn new(identifier: u8) -> Self {
        Self {
            identifier,
            name: None,
            bands: [None; EQUALIZER_BANDS_MAX as usize],
        }
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn name(&self) -> ModelResult<&Name> {
        self.name
            .as_ref()
            .ok_or(ModelError::NotInitialized("equalizer preset name"))
    }

    pub fn band(&self, band: u8) -> ModelResult<BandLevel> {
        let band = EQUALIZER_BAND_IDENTIFIERS.validate(u32::from(band))?;
        self.bands[usize::from(band) - 1]
            .ok_or(ModelError::NotInitialized("equalizer preset band"))
    }

    /// True once the name and every band level have been seen.
    pub fn is_initialized(&self) -> bool {
        self.name.is_some() && self.bands.iter().all(Option::is_some)
    }

    pub fn set_name(&mut self, name: Name) -> Change {
        set_slot(&mut self.name, name)
    }

    pub fn set_band(&mut self, band: u8, level: BandLevel) -> ModelResult<Change> {
        let band = EQUALIZER_BAND_IDENTIFIERS.validate(u32::from(band))?;
        Ok(set_slot(&mut self.bands[usize::from(band) - 1], level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_index_is_validated() {
        let mut preset = EqualizerPresetModel::new(1);
        assert!(preset.set_band(0, BandLevel::flat()).is_err());
        assert!(preset.set_band(11, BandLevel::flat()).is_err());
        assert!(preset.set_band(10, BandLevel::flat()).unwrap().is_changed());
        assert_eq!(preset.band(10).unwrap(), BandLevel::flat());
    }

    #[test]
    fn initialized_needs_name_and_all_bands() {
        let mut preset = EqualizerPresetModel::new(1);
        preset.set_name(Name::new("Rock").unwrap());
        for band in 1..=EQUALIZER_BANDS_MAX {
            assert!(!preset.is_initialized());
            preset.set_band(band, BandLevel::flat()).unwrap();
        }
        assert!(preset.is_initialized());
    }
}
