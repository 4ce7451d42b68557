//! Input source state: identifier and display name.

use crate::error::{ModelError, ModelResult};
use crate::model::types::Name;
use crate::model::{set_slot, Change};

/// State for a single input source.
#[derive(Debug, Clone)]
pub struct SourceModel {
    identifier: u8,
    name: Option<Name>,
}

impl SourceModel {
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
            .ok_or(ModelError::NotInitialized("source name"))
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
    fn name_is_uninitialized_until_seen() {
        let mut source = SourceModel::new(2);
        assert!(source.name().is_err());
        assert!(!source.is_initialized());
        source.set_name(Name::new("Tuner").unwrap());
        assert_eq!(source.name().unwrap().as_str(), "Tuner");
        assert!(source.is_initialized());
    }
}
