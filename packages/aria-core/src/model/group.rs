//! Zone group state.
//!
//! Groups are stateless aggregates: membership and name live here, but a
//! group mutation is a broadcast intent that the Zones controller translates
//! into per-member zone mutations. The group does not cache per-zone state.

use std::collections::BTreeSet;

use crate::error::{ModelError, ModelResult};
use crate::model::types::{Name, VolumeLevel, SOURCE_IDENTIFIERS, ZONE_IDENTIFIERS};
use crate::model::{set_slot, Change};

/// State for a single zone group.
#[derive(Debug, Clone)]
pub struct GroupModel {
    identifier: u8,
    name: Name,
    members: BTreeSet<u8>,
    volume: Option<VolumeLevel>,
    mute: Option<bool>,
    source: Option<u8>,
}

impl GroupModel {
    /// Creates the default model for `identifier`: an empty group with a
    /// placeholder name. Groups are purely local, so they are considered
    /// initialized from process start.
    pub fn new(identifier: u8) -> Self {
        let name = Name::new(&format!("Group {identifier}"))
            .unwrap_or_else(|_| Name::new("Group").expect("literal name is valid"));
        Self {
            identifier,
            name,
            members: BTreeSet::new(),
            volume: None,
            mute: None,
            source: None,
        }
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Member zone identifiers in ascending order.
    pub fn members(&self) -> impl Iterator<Item = u8> + '_ {
        self.members.iter().copied()
    }

    pub fn contains(&self, zone: u8) -> bool {
        self.members.contains(&zone)
    }

    pub fn set_name(&mut self, name: Name) -> Change {
        if self.name == name {
            Change::AlreadySet
        } else {
            self.name = name;
            Change::Changed
        }
    }

    /// Adds a zone to the group.
    pub fn add_zone(&mut self, zone: u8) -> ModelResult<Change> {
        let zone = ZONE_IDENTIFIERS.validate(u32::from(zone))?;
        if self.members.insert(zone) {
            Ok(Change::Changed)
        } else {
            Ok(Change::AlreadySet)
        }
    }

    /// Removes a zone from the group; the zone must be a member.
    pub fn remove_zone(&mut self, zone: u8) -> ModelResult<Change> {
        let zone = ZONE_IDENTIFIERS.validate(u32::from(zone))?;
        if self.members.remove(&zone) {
            Ok(Change::Changed)
        } else {
            Err(ModelError::NotFound("group member"))
        }
    }

    /// Empties the member set.
    pub fn clear_zones(&mut self) -> Change {
        if self.members.is_empty() {
            Change::AlreadySet
        } else {
            self.members.clear();
            Change::Changed
        }
    }

    // Aggregate fields updated by broadcast intents. They are echoed to the
    // requester but never used for synthesis; the per-zone models are the
    // source of truth.

    pub fn set_volume(&mut self, volume: VolumeLevel) -> Change {
        set_slot(&mut self.volume, volume)
    }

    pub fn volume(&self) -> Option<VolumeLevel> {
        self.volume
    }

    pub fn set_mute(&mut self, mute: bool) -> Change {
        set_slot(&mut self.mute, mute)
    }

    pub fn mute(&self) -> Option<bool> {
        self.mute
    }

    pub fn set_source(&mut self, source: u8) -> ModelResult<Change> {
        let source = SOURCE_IDENTIFIERS.validate(u32::from(source))?;
        Ok(set_slot(&mut self.source, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_validated_and_ordered() {
        let mut group = GroupModel::new(2);
        assert!(group.add_zone(0).is_err());
        assert!(group.add_zone(25).is_err());
        group.add_zone(3).unwrap();
        group.add_zone(1).unwrap();
        group.add_zone(2).unwrap();
        assert_eq!(group.members().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_add_is_already_set() {
        let mut group = GroupModel::new(1);
        assert!(group.add_zone(5).unwrap().is_changed());
        assert!(!group.add_zone(5).unwrap().is_changed());
    }

    #[test]
    fn removing_a_non_member_is_not_found() {
        let mut group = GroupModel::new(1);
        group.add_zone(4).unwrap();
        assert_eq!(
            group.remove_zone(5).unwrap_err(),
            ModelError::NotFound("group member")
        );
        assert!(group.remove_zone(4).unwrap().is_changed());
    }

    #[test]
    fn clear_on_empty_group_is_already_set() {
        let mut group = GroupModel::new(1);
        assert!(!group.clear_zones().is_changed());
        group.add_zone(1).unwrap();
        assert!(group.clear_zones().is_changed());
        assert_eq!(group.members().count(), 0);
    }

    #[test]
    fn groups_carry_a_default_name() {
        let group = GroupModel::new(7);
        assert_eq!(group.name().as_str(), "Group 7");
    }
}
