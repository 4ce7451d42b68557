//! Front panel state: display brightness and the lockout flag.

use crate::error::{ModelError, ModelResult};
use crate::model::types::Brightness;
use crate::model::{set_slot, Change};

/// State for the device front panel.
#[derive(Debug, Clone, Default)]
pub struct FrontPanelModel {
    brightness: Option<Brightness>,
    locked: Option<bool>,
}

impl FrontPanelModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brightness(&self) -> ModelResult<Brightness> {
        self.brightness
            .ok_or(ModelError::NotInitialized("front panel brightness"))
    }

    pub fn locked(&self) -> ModelResult<bool> {
        self.locked
            .ok_or(ModelError::NotInitialized("front panel locked"))
    }

    pub fn is_initialized(&self) -> bool {
        self.brightness.is_some() && self.locked.is_some()
    }

    pub fn set_brightness(&mut self, brightness: Brightness) -> Change {
        set_slot(&mut self.brightness, brightness)
    }

    pub fn set_locked(&mut self, locked: bool) -> Change {
        set_slot(&mut self.locked, locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_initialize_independently() {
        let mut panel = FrontPanelModel::new();
        panel.set_locked(false);
        assert!(panel.locked().is_ok());
        assert!(panel.brightness().is_err());
        assert!(!panel.is_initialized());
        panel.set_brightness(Brightness::new(2).unwrap());
        assert!(panel.is_initialized());
    }
}
