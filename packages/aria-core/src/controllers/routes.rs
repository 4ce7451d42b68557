//! Dispatch routes connecting wire patterns to controller handlers.
//!
//! A route is the parsed identity of an operation: the server command
//! manager resolves each downstream request to a [`RequestRoute`], and the
//! client command manager resolves upstream records to a
//! [`NotificationRoute`]. Routes carry no data; captures travel alongside.

/// Identity of a downstream request handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestRoute {
    // Zones
    ZoneQuery,
    ZoneQueryVolume,
    ZoneQueryMute,
    ZoneQuerySource,
    ZoneSetVolume,
    ZoneVolumeUp,
    ZoneVolumeDown,
    ZoneSetVolumeAll,
    ZoneSetVolumeFixed,
    ZoneMute,
    ZoneUnmute,
    ZoneToggleMute,
    ZoneSetSource,
    ZoneSetSourceAll,
    ZoneSetBalance,
    ZoneAdjustBalance,
    ZoneSetTone,
    ZoneSetBass,
    ZoneSetTreble,
    ZoneBassUp,
    ZoneBassDown,
    ZoneTrebleUp,
    ZoneTrebleDown,
    ZoneSetEqualizerBand,
    ZoneEqualizerBandUp,
    ZoneEqualizerBandDown,
    ZoneSetEqualizerPreset,
    ZoneSetSoundMode,
    ZoneSetHighpass,
    ZoneSetLowpass,
    ZoneSetName,

    // Groups
    GroupQuery,
    GroupSetName,
    GroupAddZone,
    GroupRemoveZone,
    GroupClearZones,
    GroupSetVolume,
    GroupVolumeUp,
    GroupVolumeDown,
    GroupSetMute,
    GroupToggleMute,
    GroupSetSource,

    // Sources and favorites
    SourceQuery,
    SourceSetName,
    FavoriteQuery,
    FavoriteSetName,

    // Equalizer presets
    PresetQuery,
    PresetSetName,
    PresetSetBand,
    PresetBandUp,
    PresetBandDown,

    // Front panel and infrared
    FrontPanelQueryBrightness,
    FrontPanelQueryLocked,
    FrontPanelSetBrightness,
    FrontPanelSetLocked,
    InfraredQuery,
    InfraredSet,

    // Network and configuration
    NetworkQuery,
    ConfigurationQuery,
}

/// Identity of an upstream notification (or response-record) handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationRoute {
    ZoneName,
    ZoneSource,
    ZoneSourceAll,
    ZoneVolume,
    ZoneVolumeAll,
    ZoneVolumeFixed,
    ZoneMute,
    ZoneSoundMode,
    ZoneEqualizerBand,
    ZoneEqualizerPreset,
    ZoneTone,
    ZoneHighpass,
    ZoneLowpass,
    ZoneBalance,
    SourceName,
    FavoriteName,
    PresetName,
    PresetBand,
    FrontPanelBrightness,
    FrontPanelLocked,
    InfraredDisabled,
    NetworkDhcp,
    NetworkAddress,
    NetworkNetmask,
    NetworkGateway,
    NetworkMac,
    NetworkSddp,
}
