//! Typed state-change events for internal observers.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the engine to emit events
//! - Event types for each object family plus the refresh lifecycle
//!
//! Events fire only when a model setter reports *changed*; already-set
//! writes are acknowledged on the wire but stay silent here. Wire fan-out of
//! notification bytes is separate and handled by the server command manager.

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::model::types::SoundMode;

/// Events emitted to internal observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum ProxyEvent {
    /// Per-zone state changes.
    Zone(ZoneEvent),

    /// Group membership, naming, and broadcast intents.
    Group(GroupEvent),

    /// Source name changes.
    Source(SourceEvent),

    /// Favorite name changes.
    Favorite(FavoriteEvent),

    /// Equalizer preset name and band changes.
    EqualizerPreset(EqualizerPresetEvent),

    /// Front panel changes.
    FrontPanel(FrontPanelEvent),

    /// Infrared receiver changes.
    Infrared(InfraredEvent),

    /// Network interface state learned from the device.
    Network(NetworkEvent),

    /// Refresh lifecycle.
    Refresh(RefreshEvent),
}

/// Per-zone state changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ZoneEvent {
    NameChanged { zone: u8, name: String },
    VolumeChanged { zone: u8, level: i16 },
    VolumeFixedChanged { zone: u8, fixed: bool },
    MuteChanged { zone: u8, muted: bool },
    SourceChanged { zone: u8, source: u8 },
    BalanceChanged { zone: u8, balance: i16 },
    ToneChanged { zone: u8, bass: i16, treble: i16 },
    SoundModeChanged { zone: u8, mode: SoundMode },
    EqualizerBandChanged { zone: u8, band: u8, level: i16 },
    EqualizerPresetChanged { zone: u8, preset: u8 },
    HighpassChanged { zone: u8, frequency: u32 },
    LowpassChanged { zone: u8, frequency: u32 },
}

/// A group mutation the Zones controller translates into per-member zone
/// mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GroupIntent {
    SetVolume { level: i16 },
    VolumeUp,
    VolumeDown,
    SetMute { muted: bool },
    ToggleMute,
    SetSource { source: u8 },
}

/// Group state changes and broadcast intents.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GroupEvent {
    NameChanged {
        group: u8,
        name: String,
    },
    MembersChanged {
        group: u8,
        members: Vec<u8>,
    },
    /// A volume/mute/source request observed on a group; carries the member
    /// set it applies to.
    Intent {
        group: u8,
        members: Vec<u8>,
        intent: GroupIntent,
    },
}

/// Source name changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceEvent {
    NameChanged { source: u8, name: String },
}

/// Favorite name changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FavoriteEvent {
    NameChanged { favorite: u8, name: String },
}

/// Equalizer preset changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EqualizerPresetEvent {
    NameChanged { preset: u8, name: String },
    BandChanged { preset: u8, band: u8, level: i16 },
}

/// Front panel changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FrontPanelEvent {
    BrightnessChanged { brightness: u8 },
    LockedChanged { locked: bool },
}

/// Infrared receiver changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InfraredEvent {
    DisabledChanged { disabled: bool },
}

/// Network interface changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NetworkEvent {
    SettingsChanged,
}

/// Refresh lifecycle events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RefreshEvent {
    /// The bootstrap wave started; queries are being issued.
    Started,
    /// One controller's model is fully populated.
    ControllerRefreshed { controller: &'static str },
    /// The whole wave drained. Fires exactly once per refresh cycle.
    DidRefresh,
}

// From implementations for converting inner events to ProxyEvent
impl From<ZoneEvent> for ProxyEvent {
    fn from(event: ZoneEvent) -> Self {
        ProxyEvent::Zone(event)
    }
}

impl From<GroupEvent> for ProxyEvent {
    fn from(event: GroupEvent) -> Self {
        ProxyEvent::Group(event)
    }
}

impl From<SourceEvent> for ProxyEvent {
    fn from(event: SourceEvent) -> Self {
        ProxyEvent::Source(event)
    }
}

impl From<FavoriteEvent> for ProxyEvent {
    fn from(event: FavoriteEvent) -> Self {
        ProxyEvent::Favorite(event)
    }
}

impl From<EqualizerPresetEvent> for ProxyEvent {
    fn from(event: EqualizerPresetEvent) -> Self {
        ProxyEvent::EqualizerPreset(event)
    }
}

impl From<FrontPanelEvent> for ProxyEvent {
    fn from(event: FrontPanelEvent) -> Self {
        ProxyEvent::FrontPanel(event)
    }
}

impl From<InfraredEvent> for ProxyEvent {
    fn from(event: InfraredEvent) -> Self {
        ProxyEvent::Infrared(event)
    }
}

impl From<NetworkEvent> for ProxyEvent {
    fn from(event: NetworkEvent) -> Self {
        ProxyEvent::Network(event)
    }
}

impl From<RefreshEvent> for ProxyEvent {
    fn from(event: RefreshEvent) -> Self {
        ProxyEvent::Refresh(event)
    }
}
