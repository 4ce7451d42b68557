//! In-memory mirror of device state.
//!
//! Models are created at process start with default values, mutated by
//! notification handlers and local request handlers, and destroyed at process
//! end. Every setter is idempotent: writing the value already present reports
//! [`Change::AlreadySet`], which suppresses state-change notification while
//! still letting the caller acknowledge the request.
//!
//! All models are owned by the engine task; nothing here is `Sync`-shared.

pub mod equalizer_preset;
pub mod favorite;
pub mod front_panel;
pub mod group;
pub mod infrared;
pub mod network;
pub mod source;
pub mod types;
pub mod zone;

pub use equalizer_preset::EqualizerPresetModel;
pub use favorite::FavoriteModel;
pub use front_panel::FrontPanelModel;
pub use group::GroupModel;
pub use infrared::InfraredModel;
pub use network::NetworkModel;
pub use source::SourceModel;
pub use zone::ZoneModel;

/// Outcome of a model setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// The stored value changed.
    Changed,
    /// The value was already set; no notification should fire.
    AlreadySet,
}

impl Change {
    /// True when the setter mutated state.
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Writes `value` into `slot`, reporting whether anything changed.
///
/// An uninitialized slot always reports [`Change::Changed`].
pub(crate) fn set_slot<T: PartialEq>(slot: &mut Option<T>, value: T) -> Change {
    if slot.as_ref() == Some(&value) {
        Change::AlreadySet
    } else {
        *slot = Some(value);
        Change::Changed
    }
}
