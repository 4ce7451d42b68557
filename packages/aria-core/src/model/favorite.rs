//! Favorite slot state: identifier and display name.

use crate::error::{ModelError, ModelResult};
use crate::model::types::Name;
use crate::model::{set_slot, Change};

/// State for a single favorite slot.
#[derive(Debug, Clone)]
pub struct FavoriteModel {
    identifier: u8,
    name: Option<Name>,
}

impl FavoriteModel {
    pub fn new(identifier: u8) -> Self {
        Self {
            identifier,
            name: None,
        }
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn name(&self) -> ModelResult<&Name> {
        self.name
            .as_ref()
            .ok_or(ModelError::NotInitialized("favorite name"))
    }

    pub fn is_initialized(&self) -> bool {
        self.name.is_some()
    }

    pub fn set_name(&mut self, name: Name) -> Change {
        set_slot(&mut self.name, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent_name_write() {
        let mut favorite = FavoriteModel::new(1);
        assert!(favorite.set_name(Name::new("Jazz").unwrap()).is_changed());
        assert!(!favorite.set_name(Name::new("Jazz").unwrap()).is_changed());
    }
}
