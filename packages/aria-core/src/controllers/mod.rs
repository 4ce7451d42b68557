//! Object controllers: one per object family, plus the shared basis.
//!
//! Each controller registers the request patterns it handles and the
//! upstream notification patterns it cares about, implements the
//! local-vs-forward decision for observations, and owns its slice of the
//! model. The [`ControllerSet`] is the dispatch surface the engine drives:
//! requests arrive as a [`routes::RequestRoute`], upstream records as a
//! [`routes::NotificationRoute`], and group intents flow from the Groups
//! controller to the Zones controller through the set.

pub mod basis;
pub mod configuration;
pub mod equalizer_presets;
pub mod favorites;
pub mod front_panel;
pub mod groups;
pub mod infrared;
pub mod network;
pub mod routes;
pub mod sources;
pub mod zones;

use regex::Captures;
use tokio::time::Duration;

pub use basis::{ControllerBasis, ObjectController};
pub use configuration::ConfigurationController;
pub use equalizer_presets::EqualizerPresetsController;
pub use favorites::FavoritesController;
pub use front_panel::FrontPanelController;
pub use groups::GroupsController;
pub use infrared::InfraredController;
pub use network::NetworkController;
pub use routes::{NotificationRoute, RequestRoute};
pub use sources::SourcesController;
pub use zones::ZonesController;

use crate::client::ClientCommandManager;
use crate::error::{ProxyError, ProxyResult};
use crate::events::EventEmitter;
use crate::model::Change;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::configuration as configuration_vocab;
use crate::refresh::RefreshFamily;
use crate::server::{ConnectionId, ServerCommandManager};

/// Mutable engine state handed into every controller call.
///
/// The engine task owns all three; handlers run to completion on that task,
/// so there is no concurrent model mutation.
pub struct EngineContext<'a> {
    pub client: &'a mut ClientCommandManager,
    pub server: &'a mut ServerCommandManager,
    pub emitter: &'a dyn EventEmitter,
}

/// Every object controller, in one dispatchable bundle.
pub struct ControllerSet {
    pub zones: ZonesController,
    pub groups: GroupsController,
    pub sources: SourcesController,
    pub favorites: FavoritesController,
    pub equalizer_presets: EqualizerPresetsController,
    pub front_panel: FrontPanelController,
    pub infrared: InfraredController,
    pub network: NetworkController,
    pub configuration: ConfigurationController,
}

impl ControllerSet {
    pub fn new(timeout: Duration) -> Self {
        let basis = ControllerBasis::new(timeout);
        Self {
            zones: ZonesController::new(basis),
            groups: GroupsController::new(),
            sources: SourcesController::new(basis),
            favorites: FavoritesController::new(basis),
            equalizer_presets: EqualizerPresetsController::new(basis),
            front_panel: FrontPanelController::new(basis),
            infrared: InfraredController::new(basis),
            network: NetworkController::new(basis),
            configuration: ConfigurationController::new(basis),
        }
    }

    /// Registers every controller's request and notification patterns, in
    /// configuration-dump order.
    pub fn register(server: &mut ServerCommandManager, client: &mut ClientCommandManager) {
        FavoritesController::register(server, client);
        SourcesController::register(server, client);
        EqualizerPresetsController::register(server, client);
        FrontPanelController::register(server, client);
        InfraredController::register(server, client);
        NetworkController::register(server, client);
        ZonesController::register(server, client);
        GroupsController::register(server);
        ConfigurationController::register(server);
    }

    /// Dispatches one parsed downstream request to its controller.
    ///
    /// `reproxied` is true when a forwarded observation completed and the
    /// original request re-enters its handler; a handler seeing it set must
    /// not forward a second time.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_request(
        &mut self,
        ctx: &mut EngineContext<'_>,
        route: RequestRoute,
        captures: &Captures<'_>,
        origin: ConnectionId,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        use RequestRoute as R;
        match route {
            // Zones: observations
            R::ZoneQuery => self.zones.on_query(ctx, origin, captures, record, reproxied),
            R::ZoneQueryVolume => {
                self.zones.on_query_volume(ctx, origin, captures, record, reproxied)
            }
            R::ZoneQueryMute => {
                self.zones.on_query_mute(ctx, origin, captures, record, reproxied)
            }
            R::ZoneQuerySource => {
                self.zones.on_query_source(ctx, origin, captures, record, reproxied)
            }

            // Zones: mutations
            R::ZoneSetVolume => self.zones.on_set_volume(ctx, origin, captures, record),
            R::ZoneVolumeUp | R::ZoneVolumeDown => {
                self.zones.on_adjust_volume(ctx, origin, captures, record)
            }
            R::ZoneSetVolumeAll => self.zones.on_set_volume_all(ctx, origin, captures, record),
            R::ZoneSetVolumeFixed => {
                self.zones.on_set_volume_fixed(ctx, origin, captures, record)
            }
            R::ZoneMute | R::ZoneUnmute | R::ZoneToggleMute => {
                self.zones.on_set_mute(ctx, origin, captures, record)
            }
            R::ZoneSetSource => self.zones.on_set_source(ctx, origin, captures, record),
            R::ZoneSetSourceAll => self.zones.on_set_source_all(ctx, origin, captures, record),
            R::ZoneSetBalance => self.zones.on_set_balance(ctx, origin, captures, record),
            R::ZoneAdjustBalance => self.zones.on_adjust_balance(ctx, origin, captures, record),
            R::ZoneSetTone => self.zones.on_set_tone(ctx, origin, captures, record),
            R::ZoneSetBass => self.zones.on_set_bass(ctx, origin, captures),
            R::ZoneSetTreble => self.zones.on_set_treble(ctx, origin, captures),
            R::ZoneBassUp => self.zones.on_adjust_bass(ctx, origin, captures, 1),
            R::ZoneBassDown => self.zones.on_adjust_bass(ctx, origin, captures, -1),
            R::ZoneTrebleUp => self.zones.on_adjust_treble(ctx, origin, captures, 1),
            R::ZoneTrebleDown => self.zones.on_adjust_treble(ctx, origin, captures, -1),
            R::ZoneSetEqualizerBand => {
                self.zones.on_set_equalizer_band(ctx, origin, captures, record)
            }
            R::ZoneEqualizerBandUp | R::ZoneEqualizerBandDown => {
                self.zones.on_adjust_equalizer_band(ctx, origin, captures, record)
            }
            R::ZoneSetEqualizerPreset => {
                self.zones.on_set_equalizer_preset(ctx, origin, captures, record)
            }
            R::ZoneSetSoundMode => self.zones.on_set_sound_mode(ctx, origin, captures, record),
            R::ZoneSetHighpass => self.zones.on_set_highpass(ctx, origin, captures, record),
            R::ZoneSetLowpass => self.zones.on_set_lowpass(ctx, origin, captures, record),
            R::ZoneSetName => self.zones.on_set_name(ctx, origin, captures, record),

            // Groups: local mutations
            R::GroupQuery => self.groups.on_query(ctx, origin, captures, record),
            R::GroupSetName => self.groups.on_set_name(ctx, origin, captures),
            R::GroupAddZone => self.groups.on_add_zone(ctx, origin, captures),
            R::GroupRemoveZone => self.groups.on_remove_zone(ctx, origin, captures),
            R::GroupClearZones => self.groups.on_clear_zones(ctx, origin, captures),

            // Groups: broadcast intents, translated by the zones controller
            R::GroupSetVolume => {
                let intent = self.groups.on_set_volume(ctx, origin, captures)?;
                self.apply_intent(ctx, intent)
            }
            R::GroupVolumeUp => {
                let intent = self.groups.on_volume_up(ctx, origin, captures)?;
                self.apply_intent(ctx, intent)
            }
            R::GroupVolumeDown => {
                let intent = self.groups.on_volume_down(ctx, origin, captures)?;
                self.apply_intent(ctx, intent)
            }
            R::GroupSetMute => {
                let intent = self.groups.on_set_mute(ctx, origin, captures)?;
                self.apply_intent(ctx, intent)
            }
            R::GroupToggleMute => {
                let intent = self.groups.on_toggle_mute(ctx, origin, captures)?;
                self.apply_intent(ctx, intent)
            }
            R::GroupSetSource => {
                let intent = self.groups.on_set_source(ctx, origin, captures)?;
                self.apply_intent(ctx, intent)
            }

            // Sources and favorites
            R::SourceQuery => {
                self.sources.on_query(ctx, origin, captures, record, reproxied)
            }
            R::SourceSetName => self.sources.on_set_name(ctx, origin, captures, record),
            R::FavoriteQuery => {
                self.favorites.on_query(ctx, origin, captures, record, reproxied)
            }
            R::FavoriteSetName => self.favorites.on_set_name(ctx, origin, captures, record),

            // Equalizer presets
            R::PresetQuery => {
                self.equalizer_presets
                    .on_query(ctx, origin, captures, record, reproxied)
            }
            R::PresetSetName => {
                self.equalizer_presets.on_set_name(ctx, origin, captures, record)
            }
            R::PresetSetBand => {
                self.equalizer_presets.on_set_band(ctx, origin, captures, record)
            }
            R::PresetBandUp | R::PresetBandDown => {
                self.equalizer_presets
                    .on_adjust_band(ctx, origin, captures, record)
            }

            // Front panel and infrared
            R::FrontPanelQueryBrightness => {
                self.front_panel.on_query_brightness(ctx, origin, record, reproxied)
            }
            R::FrontPanelQueryLocked => {
                self.front_panel.on_query_locked(ctx, origin, record, reproxied)
            }
            R::FrontPanelSetBrightness => {
                self.front_panel.on_set_brightness(ctx, origin, captures, record)
            }
            R::FrontPanelSetLocked => {
                self.front_panel.on_set_locked(ctx, origin, captures, record)
            }
            R::InfraredQuery => self.infrared.on_query(ctx, origin, record, reproxied),
            R::InfraredSet => self.infrared.on_set_disabled(ctx, origin, captures, record),

            // Network and configuration
            R::NetworkQuery => self.network.on_query(ctx, origin, record, reproxied),
            R::ConfigurationQuery => {
                self.on_configuration_query(ctx, origin, record, reproxied)
            }
        }
    }

    fn apply_intent(
        &mut self,
        ctx: &mut EngineContext<'_>,
        intent: Option<groups::PendingIntent>,
    ) -> ProxyResult<()> {
        if let Some(intent) = intent {
            self.zones
                .apply_group_intent(ctx.client, &intent.members, intent.intent);
        }
        Ok(())
    }

    /// Applies one upstream record to the model via its notification route.
    pub fn apply_notification(
        &mut self,
        route: NotificationRoute,
        record: &Record,
        emitter: &dyn EventEmitter,
    ) -> ProxyResult<Change> {
        use NotificationRoute as N;
        match route {
            N::ZoneName
            | N::ZoneSource
            | N::ZoneSourceAll
            | N::ZoneVolume
            | N::ZoneVolumeAll
            | N::ZoneVolumeFixed
            | N::ZoneMute
            | N::ZoneSoundMode
            | N::ZoneEqualizerBand
            | N::ZoneEqualizerPreset
            | N::ZoneTone
            | N::ZoneHighpass
            | N::ZoneLowpass
            | N::ZoneBalance => self.zones.apply_notification(route, record, emitter),
            N::SourceName => self.sources.apply_notification(record, emitter),
            N::FavoriteName => self.favorites.apply_notification(record, emitter),
            N::PresetName | N::PresetBand => {
                self.equalizer_presets.apply_notification(route, record, emitter)
            }
            N::FrontPanelBrightness | N::FrontPanelLocked => {
                self.front_panel.apply_notification(route, record, emitter)
            }
            N::InfraredDisabled => self.infrared.apply_notification(record, emitter),
            N::NetworkDhcp
            | N::NetworkAddress
            | N::NetworkNetmask
            | N::NetworkGateway
            | N::NetworkMac
            | N::NetworkSddp => self.network.apply_notification(route, record, emitter),
        }
    }

    /// Queues the bootstrap wave, returning per-family exchange counts.
    pub fn refresh(&self, client: &mut ClientCommandManager) -> Vec<(RefreshFamily, usize)> {
        vec![
            (RefreshFamily::Favorites, self.favorites.refresh(client)),
            (RefreshFamily::Sources, self.sources.refresh(client)),
            (
                RefreshFamily::EqualizerPresets,
                self.equalizer_presets.refresh(client),
            ),
            (RefreshFamily::FrontPanel, self.front_panel.refresh(client)),
            (RefreshFamily::Infrared, self.infrared.refresh(client)),
            (RefreshFamily::Network, self.network.refresh(client)),
            (RefreshFamily::Zones, self.zones.refresh(client)),
        ]
    }

    /// Serializes the full configuration dump from local state.
    pub fn configuration_records(&self) -> ProxyResult<Vec<Record>> {
        let mut buffer = Vec::new();
        self.favorites.query_current_configuration(&mut buffer)?;
        self.sources.query_current_configuration(&mut buffer)?;
        self.equalizer_presets.query_current_configuration(&mut buffer)?;
        self.front_panel.query_current_configuration(&mut buffer)?;
        self.infrared.query_current_configuration(&mut buffer)?;
        self.network.query_current_configuration(&mut buffer)?;
        self.zones.query_current_configuration(&mut buffer)?;
        self.groups.query_current_configuration(&mut buffer)?;
        Ok(buffer)
    }

    fn on_configuration_query(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        match self.configuration_records() {
            Ok(mut records) => {
                records.push(configuration_vocab::query_complete());
                ctx.server.send_records(origin, &records);
                Ok(())
            }
            Err(error) if error.is_not_initialized() && !reproxied => {
                self.configuration.forward(ctx.client, origin, record);
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

/// Maps a handler failure to the uniform downstream policy: every error
/// kind surfaces as one `(ERROR)` frame for the originating request.
pub fn respond_with_error(
    server: &ServerCommandManager,
    origin: ConnectionId,
    request: &Record,
    error: &ProxyError,
) {
    log::warn!(
        "[Controllers] Request `{}` from connection {} failed: {} ({})",
        request.body_str().unwrap_or("<binary>"),
        origin,
        error,
        error.code()
    );
    server.send_error_response(origin);
}
