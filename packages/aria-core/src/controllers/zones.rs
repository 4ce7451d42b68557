//! Zones controller.
//!
//! All zone mutations are forwarded upstream; their completions update the
//! model by parsing the upstream response as the corresponding notification
//! form. Observations are synthesized locally once the model holds every
//! field they need, and fall back to a forwarded observation otherwise.
//!
//! Standalone bass and treble mutations do not exist on the device: the
//! controller reads the other tone field from the model (flat when never
//! seen) and forwards a combined set-tone request instead.

use regex::Captures;

use crate::client::{BundlePart, ClientCommandManager, ResponseMatcher};
use crate::controllers::basis::{ControllerBasis, ObjectController};
use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::controllers::EngineContext;
use crate::error::{ProxyError, ProxyResult};
use crate::events::{EventEmitter, GroupIntent, ZoneEvent};
use crate::model::types::{
    BalanceLevel, BandLevel, CrossoverFrequency, Name, SoundMode, ToneLevel, VolumeLevel,
    EQUALIZER_BANDS_MAX, ZONE_IDENTIFIERS,
};
use crate::model::{Change, ZoneModel};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{
    capture_flag, capture_i16, capture_str, capture_u32, zones as vocab,
};
use crate::refresh::RefreshFamily;
use crate::server::{ConnectionId, ServerCommandManager};

/// Interior records of a full zone query response.
static ZONE_QUERY_PARTS: &[BundlePart] = &[
    BundlePart {
        pattern: &vocab::NAME_RESPONSE,
        route: NotificationRoute::ZoneName,
    },
    BundlePart {
        pattern: &vocab::SOURCE_RESPONSE,
        route: NotificationRoute::ZoneSource,
    },
    BundlePart {
        pattern: &vocab::VOLUME_RESPONSE,
        route: NotificationRoute::ZoneVolume,
    },
    BundlePart {
        pattern: &vocab::VOLUME_FIXED_RESPONSE,
        route: NotificationRoute::ZoneVolumeFixed,
    },
    BundlePart {
        pattern: &vocab::MUTE_RESPONSE,
        route: NotificationRoute::ZoneMute,
    },
    BundlePart {
        pattern: &vocab::SOUND_MODE_RESPONSE,
        route: NotificationRoute::ZoneSoundMode,
    },
    BundlePart {
        pattern: &vocab::EQUALIZER_BAND_RESPONSE,
        route: NotificationRoute::ZoneEqualizerBand,
    },
    BundlePart {
        pattern: &vocab::EQUALIZER_PRESET_RESPONSE,
        route: NotificationRoute::ZoneEqualizerPreset,
    },
    BundlePart {
        pattern: &vocab::TONE_RESPONSE,
        route: NotificationRoute::ZoneTone,
    },
    BundlePart {
        pattern: &vocab::HIGHPASS_RESPONSE,
        route: NotificationRoute::ZoneHighpass,
    },
    BundlePart {
        pattern: &vocab::LOWPASS_RESPONSE,
        route: NotificationRoute::ZoneLowpass,
    },
    BundlePart {
        pattern: &vocab::BALANCE_RESPONSE,
        route: NotificationRoute::ZoneBalance,
    },
];

static VOLUME_QUERY_PARTS: &[BundlePart] = &[BundlePart {
    pattern: &vocab::VOLUME_RESPONSE,
    route: NotificationRoute::ZoneVolume,
}];

static MUTE_QUERY_PARTS: &[BundlePart] = &[BundlePart {
    pattern: &vocab::MUTE_RESPONSE,
    route: NotificationRoute::ZoneMute,
}];

static SOURCE_QUERY_PARTS: &[BundlePart] = &[BundlePart {
    pattern: &vocab::SOURCE_RESPONSE,
    route: NotificationRoute::ZoneSource,
}];

/// Controller for the zone object family.
pub struct ZonesController {
    basis: ControllerBasis,
    zones: Vec<ZoneModel>,
}

impl ZonesController {
    pub fn new(basis: ControllerBasis) -> Self {
        Self {
            basis,
            zones: ZONE_IDENTIFIERS.iter().map(ZoneModel::new).collect(),
        }
    }

    /// Registers this controller's request and notification patterns.
    pub fn register(server: &mut ServerCommandManager, client: &mut ClientCommandManager) {
        use RequestRoute as R;
        // Set-balance precedes adjust-balance: both start `BZ<n>,` and the
        // first registered match wins.
        let requests: &[(&'static crate::protocol::Pattern, R)] = &[
            (&vocab::QUERY_REQUEST, R::ZoneQuery),
            (&vocab::QUERY_VOLUME_REQUEST, R::ZoneQueryVolume),
            (&vocab::QUERY_MUTE_REQUEST, R::ZoneQueryMute),
            (&vocab::QUERY_SOURCE_REQUEST, R::ZoneQuerySource),
            (&vocab::SET_VOLUME_REQUEST, R::ZoneSetVolume),
            (&vocab::VOLUME_UP_REQUEST, R::ZoneVolumeUp),
            (&vocab::VOLUME_DOWN_REQUEST, R::ZoneVolumeDown),
            (&vocab::SET_VOLUME_ALL_REQUEST, R::ZoneSetVolumeAll),
            (&vocab::SET_VOLUME_FIXED_REQUEST, R::ZoneSetVolumeFixed),
            (&vocab::MUTE_REQUEST, R::ZoneMute),
            (&vocab::UNMUTE_REQUEST, R::ZoneUnmute),
            (&vocab::TOGGLE_MUTE_REQUEST, R::ZoneToggleMute),
            (&vocab::SET_SOURCE_REQUEST, R::ZoneSetSource),
            (&vocab::SET_SOURCE_ALL_REQUEST, R::ZoneSetSourceAll),
            (&vocab::SET_BALANCE_REQUEST, R::ZoneSetBalance),
            (&vocab::ADJUST_BALANCE_REQUEST, R::ZoneAdjustBalance),
            (&vocab::SET_TONE_REQUEST, R::ZoneSetTone),
            (&vocab::SET_BASS_REQUEST, R::ZoneSetBass),
            (&vocab::SET_TREBLE_REQUEST, R::ZoneSetTreble),
            (&vocab::BASS_UP_REQUEST, R::ZoneBassUp),
            (&vocab::BASS_DOWN_REQUEST, R::ZoneBassDown),
            (&vocab::TREBLE_UP_REQUEST, R::ZoneTrebleUp),
            (&vocab::TREBLE_DOWN_REQUEST, R::ZoneTrebleDown),
            (&vocab::SET_EQUALIZER_BAND_REQUEST, R::ZoneSetEqualizerBand),
            (&vocab::EQUALIZER_BAND_UP_REQUEST, R::ZoneEqualizerBandUp),
            (&vocab::EQUALIZER_BAND_DOWN_REQUEST, R::ZoneEqualizerBandDown),
            (&vocab::SET_EQUALIZER_PRESET_REQUEST, R::ZoneSetEqualizerPreset),
            (&vocab::SET_SOUND_MODE_REQUEST, R::ZoneSetSoundMode),
            (&vocab::SET_HIGHPASS_REQUEST, R::ZoneSetHighpass),
            (&vocab::SET_LOWPASS_REQUEST, R::ZoneSetLowpass),
            (&vocab::SET_NAME_REQUEST, R::ZoneSetName),
        ];
        for (pattern, route) in requests.iter().copied() {
            server.register_request(pattern, route);
        }

        use NotificationRoute as N;
        let notifications: &[(&'static crate::protocol::Pattern, N)] = &[
            (&vocab::NAME_RESPONSE, N::ZoneName),
            (&vocab::SOURCE_RESPONSE, N::ZoneSource),
            (&vocab::SOURCE_ALL_RESPONSE, N::ZoneSourceAll),
            (&vocab::VOLUME_RESPONSE, N::ZoneVolume),
            (&vocab::VOLUME_ALL_RESPONSE, N::ZoneVolumeAll),
            (&vocab::VOLUME_FIXED_RESPONSE, N::ZoneVolumeFixed),
            (&vocab::MUTE_RESPONSE, N::ZoneMute),
            (&vocab::SOUND_MODE_RESPONSE, N::ZoneSoundMode),
            (&vocab::EQUALIZER_BAND_RESPONSE, N::ZoneEqualizerBand),
            (&vocab::EQUALIZER_PRESET_RESPONSE, N::ZoneEqualizerPreset),
            (&vocab::TONE_RESPONSE, N::ZoneTone),
            (&vocab::HIGHPASS_RESPONSE, N::ZoneHighpass),
            (&vocab::LOWPASS_RESPONSE, N::ZoneLowpass),
            (&vocab::BALANCE_RESPONSE, N::ZoneBalance),
        ];
        for (pattern, route) in notifications.iter().copied() {
            client.register_notification(pattern, route);
        }
    }

    fn validate_zone(&self, raw: u32) -> ProxyResult<u8> {
        Ok(ZONE_IDENTIFIERS.validate(raw)?)
    }

    fn zone(&self, zone: u8) -> &ZoneModel {
        &self.zones[usize::from(zone) - 1]
    }

    fn zone_mut(&mut self, zone: u8) -> &mut ZoneModel {
        &mut self.zones[usize::from(zone) - 1]
    }

    /// Test and configuration hook: immutable access by identifier.
    pub fn model(&self, zone: u8) -> ProxyResult<&ZoneModel> {
        let zone = ZONE_IDENTIFIERS.validate(u32::from(zone))?;
        Ok(self.zone(zone))
    }

    pub fn all_initialized(&self) -> bool {
        self.zones.iter().all(ZoneModel::is_initialized)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Forwarded mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Validates and forwards a verbatim zone mutation.
    fn forward(
        &self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        record: &Record,
        expected: &'static crate::protocol::Pattern,
        route: NotificationRoute,
    ) {
        self.basis
            .proxy_mutation(ctx.client, Some(origin), record.clone(), expected, route);
    }

    pub fn on_set_volume(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        VolumeLevel::new(capture_i16(captures, 2)?)?;
        self.forward(ctx, origin, record, &vocab::VOLUME_RESPONSE, NotificationRoute::ZoneVolume);
        Ok(())
    }

    pub fn on_adjust_volume(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        self.forward(ctx, origin, record, &vocab::VOLUME_RESPONSE, NotificationRoute::ZoneVolume);
        Ok(())
    }

    pub fn on_set_volume_all(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        VolumeLevel::new(capture_i16(captures, 1)?)?;
        self.forward(
            ctx,
            origin,
            record,
            &vocab::VOLUME_ALL_RESPONSE,
            NotificationRoute::ZoneVolumeAll,
        );
        Ok(())
    }

    pub fn on_set_volume_fixed(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        capture_flag(captures, 2)?;
        self.forward(
            ctx,
            origin,
            record,
            &vocab::VOLUME_FIXED_RESPONSE,
            NotificationRoute::ZoneVolumeFixed,
        );
        Ok(())
    }

    pub fn on_set_mute(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        self.forward(ctx, origin, record, &vocab::MUTE_RESPONSE, NotificationRoute::ZoneMute);
        Ok(())
    }

    pub fn on_set_source(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        crate::model::types::SOURCE_IDENTIFIERS.validate(capture_u32(captures, 2)?)?;
        self.forward(ctx, origin, record, &vocab::SOURCE_RESPONSE, NotificationRoute::ZoneSource);
        Ok(())
    }

    pub fn on_set_source_all(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        crate::model::types::SOURCE_IDENTIFIERS.validate(capture_u32(captures, 1)?)?;
        self.forward(
            ctx,
            origin,
            record,
            &vocab::SOURCE_ALL_RESPONSE,
            NotificationRoute::ZoneSourceAll,
        );
        Ok(())
    }

    pub fn on_set_balance(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        vocab::balance_from_wire(capture_str(captures, 2)?, capture_i16(captures, 3)?)?;
        self.forward(ctx, origin, record, &vocab::BALANCE_RESPONSE, NotificationRoute::ZoneBalance);
        Ok(())
    }

    pub fn on_adjust_balance(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        self.forward(ctx, origin, record, &vocab::BALANCE_RESPONSE, NotificationRoute::ZoneBalance);
        Ok(())
    }

    pub fn on_set_tone(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        ToneLevel::new(capture_i16(captures, 2)?)?;
        ToneLevel::new(capture_i16(captures, 3)?)?;
        self.forward(ctx, origin, record, &vocab::TONE_RESPONSE, NotificationRoute::ZoneTone);
        Ok(())
    }

    /// Standalone bass/treble writes become a combined set-tone upstream.
    pub fn on_set_bass(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<()> {
        let zone = self.validate_zone(capture_u32(captures, 1)?)?;
        let bass = ToneLevel::new(capture_i16(captures, 2)?)?;
        let treble = self.zone(zone).treble_or_flat();
        self.forward_tone(ctx, origin, zone, bass, treble);
        Ok(())
    }

    pub fn on_set_treble(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<()> {
        let zone = self.validate_zone(capture_u32(captures, 1)?)?;
        let treble = ToneLevel::new(capture_i16(captures, 2)?)?;
        let bass = self.zone(zone).bass_or_flat();
        self.forward_tone(ctx, origin, zone, bass, treble);
        Ok(())
    }

    pub fn on_adjust_bass(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        step: i16,
    ) -> ProxyResult<()> {
        let zone = self.validate_zone(capture_u32(captures, 1)?)?;
        let bass = ToneLevel::new(self.zone(zone).bass_or_flat().get() + step)?;
        let treble = self.zone(zone).treble_or_flat();
        self.forward_tone(ctx, origin, zone, bass, treble);
        Ok(())
    }

    pub fn on_adjust_treble(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        step: i16,
    ) -> ProxyResult<()> {
        let zone = self.validate_zone(capture_u32(captures, 1)?)?;
        let treble = ToneLevel::new(self.zone(zone).treble_or_flat().get() + step)?;
        let bass = self.zone(zone).bass_or_flat();
        self.forward_tone(ctx, origin, zone, bass, treble);
        Ok(())
    }

    fn forward_tone(
        &self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        zone: u8,
        bass: ToneLevel,
        treble: ToneLevel,
    ) {
        let request = vocab::set_tone_request(zone, bass, treble);
        self.basis.proxy_mutation(
            ctx.client,
            Some(origin),
            request,
            &vocab::TONE_RESPONSE,
            NotificationRoute::ZoneTone,
        );
    }

    pub fn on_set_equalizer_band(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        crate::model::types::EQUALIZER_BAND_IDENTIFIERS.validate(capture_u32(captures, 2)?)?;
        BandLevel::new(capture_i16(captures, 3)?)?;
        self.forward(
            ctx,
            origin,
            record,
            &vocab::EQUALIZER_BAND_RESPONSE,
            NotificationRoute::ZoneEqualizerBand,
        );
        Ok(())
    }

    pub fn on_adjust_equalizer_band(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        crate::model::types::EQUALIZER_BAND_IDENTIFIERS.validate(capture_u32(captures, 2)?)?;
        self.forward(
            ctx,
            origin,
            record,
            &vocab::EQUALIZER_BAND_RESPONSE,
            NotificationRoute::ZoneEqualizerBand,
        );
        Ok(())
    }

    pub fn on_set_equalizer_preset(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        crate::model::types::EQUALIZER_PRESET_IDENTIFIERS.validate(capture_u32(captures, 2)?)?;
        self.forward(
            ctx,
            origin,
            record,
            &vocab::EQUALIZER_PRESET_RESPONSE,
            NotificationRoute::ZoneEqualizerPreset,
        );
        Ok(())
    }

    pub fn on_set_sound_mode(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        SoundMode::from_wire(capture_u32(captures, 2)?)?;
        self.forward(
            ctx,
            origin,
            record,
            &vocab::SOUND_MODE_RESPONSE,
            NotificationRoute::ZoneSoundMode,
        );
        Ok(())
    }

    pub fn on_set_highpass(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        CrossoverFrequency::new(capture_u32(captures, 2)?)?;
        self.forward(ctx, origin, record, &vocab::HIGHPASS_RESPONSE, NotificationRoute::ZoneHighpass);
        Ok(())
    }

    pub fn on_set_lowpass(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        CrossoverFrequency::new(capture_u32(captures, 2)?)?;
        self.forward(ctx, origin, record, &vocab::LOWPASS_RESPONSE, NotificationRoute::ZoneLowpass);
        Ok(())
    }

    pub fn on_set_name(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_zone(capture_u32(captures, 1)?)?;
        Name::new(capture_str(captures, 2)?)?;
        self.forward(ctx, origin, record, &vocab::NAME_RESPONSE, NotificationRoute::ZoneName);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observations
    // ─────────────────────────────────────────────────────────────────────

    /// Serializes one zone's full snapshot in query-response order.
    fn snapshot(&self, zone: u8) -> ProxyResult<Vec<Record>> {
        let model = self.zone(zone);
        let mut records = Vec::with_capacity(usize::from(EQUALIZER_BANDS_MAX) + 12);
        records.push(vocab::name_response(zone, model.name()?));
        records.push(vocab::source_response(zone, model.source()?));
        records.push(vocab::volume_response(zone, model.volume()?));
        records.push(vocab::volume_fixed_response(zone, model.volume_fixed()?));
        records.push(vocab::mute_response(zone, model.mute()?));
        records.push(vocab::sound_mode_response(zone, model.sound_mode()?));
        for band in 1..=EQUALIZER_BANDS_MAX {
            records.push(vocab::equalizer_band_response(
                zone,
                band,
                model.equalizer_band(band)?,
            ));
        }
        records.push(vocab::equalizer_preset_response(zone, model.equalizer_preset()?));
        let (bass, treble) = model.tone()?;
        records.push(vocab::tone_response(zone, bass, treble));
        records.push(vocab::highpass_response(zone, model.highpass()?));
        records.push(vocab::lowpass_response(zone, model.lowpass()?));
        records.push(vocab::balance_response(zone, model.balance()?));
        Ok(records)
    }

    /// Shared shape of the four observation handlers: synthesize locally,
    /// or forward once and re-enter after the model is populated.
    fn observe(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        record: &Record,
        reproxied: bool,
        route: RequestRoute,
        matcher: ResponseMatcher,
        synthesis: ProxyResult<Vec<Record>>,
    ) -> ProxyResult<()> {
        match synthesis {
            Ok(mut records) => {
                records.push(record.clone());
                ctx.server.send_records(origin, &records);
                Ok(())
            }
            Err(error) if error.is_not_initialized() && !reproxied => {
                self.basis
                    .proxy_observation(ctx.client, origin, record.clone(), matcher, route, None);
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    pub fn on_query(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        let zone = self.validate_zone(capture_u32(captures, 1)?)?;
        let synthesis = self.snapshot(zone);
        self.observe(
            ctx,
            origin,
            record,
            reproxied,
            RequestRoute::ZoneQuery,
            ResponseMatcher::Bundle {
                parts: ZONE_QUERY_PARTS,
                terminator: &vocab::QUERY_REQUEST,
            },
            synthesis,
        )
    }

    pub fn on_query_volume(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        let zone = self.validate_zone(capture_u32(captures, 1)?)?;
        let synthesis = self
            .zone(zone)
            .volume()
            .map(|volume| vec![vocab::volume_response(zone, volume)])
            .map_err(ProxyError::from);
        self.observe(
            ctx,
            origin,
            record,
            reproxied,
            RequestRoute::ZoneQueryVolume,
            ResponseMatcher::Bundle {
                parts: VOLUME_QUERY_PARTS,
                terminator: &vocab::QUERY_VOLUME_REQUEST,
            },
            synthesis,
        )
    }

    pub fn on_query_mute(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        let zone = self.validate_zone(capture_u32(captures, 1)?)?;
        let synthesis = self
            .zone(zone)
            .mute()
            .map(|muted| vec![vocab::mute_response(zone, muted)])
            .map_err(ProxyError::from);
        self.observe(
            ctx,
            origin,
            record,
            reproxied,
            RequestRoute::ZoneQueryMute,
            ResponseMatcher::Bundle {
                parts: MUTE_QUERY_PARTS,
                terminator: &vocab::QUERY_MUTE_REQUEST,
            },
            synthesis,
        )
    }

    pub fn on_query_source(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        let zone = self.validate_zone(capture_u32(captures, 1)?)?;
        let synthesis = self
            .zone(zone)
            .source()
            .map(|source| vec![vocab::source_response(zone, source)])
            .map_err(ProxyError::from);
        self.observe(
            ctx,
            origin,
            record,
            reproxied,
            RequestRoute::ZoneQuerySource,
            ResponseMatcher::Bundle {
                parts: SOURCE_QUERY_PARTS,
                terminator: &vocab::QUERY_SOURCE_REQUEST,
            },
            synthesis,
        )
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────

    /// Applies one notification-form record to the model, emitting a typed
    /// event when the value changed.
    pub fn apply_notification(
        &mut self,
        route: NotificationRoute,
        record: &Record,
        emitter: &dyn EventEmitter,
    ) -> ProxyResult<Change> {
        let body = record
            .body_str()
            .ok_or_else(|| ProxyError::BadCommand("non-text record".into()))?;
        let pattern = match route {
            NotificationRoute::ZoneName => &vocab::NAME_RESPONSE,
            NotificationRoute::ZoneSource => &vocab::SOURCE_RESPONSE,
            NotificationRoute::ZoneSourceAll => &vocab::SOURCE_ALL_RESPONSE,
            NotificationRoute::ZoneVolume => &vocab::VOLUME_RESPONSE,
            NotificationRoute::ZoneVolumeAll => &vocab::VOLUME_ALL_RESPONSE,
            NotificationRoute::ZoneVolumeFixed => &vocab::VOLUME_FIXED_RESPONSE,
            NotificationRoute::ZoneMute => &vocab::MUTE_RESPONSE,
            NotificationRoute::ZoneSoundMode => &vocab::SOUND_MODE_RESPONSE,
            NotificationRoute::ZoneEqualizerBand => &vocab::EQUALIZER_BAND_RESPONSE,
            NotificationRoute::ZoneEqualizerPreset => &vocab::EQUALIZER_PRESET_RESPONSE,
            NotificationRoute::ZoneTone => &vocab::TONE_RESPONSE,
            NotificationRoute::ZoneHighpass => &vocab::HIGHPASS_RESPONSE,
            NotificationRoute::ZoneLowpass => &vocab::LOWPASS_RESPONSE,
            NotificationRoute::ZoneBalance => &vocab::BALANCE_RESPONSE,
            _ => return Err(ProxyError::BadCommand("route misdirected to zones".into())),
        };
        let captures = pattern
            .matches(body)
            .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;

        match route {
            NotificationRoute::ZoneName => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let name = Name::new(capture_str(&captures, 2)?)?;
                let change = self.zone_mut(zone).set_name(name.clone());
                if change.is_changed() {
                    emitter.emit(
                        ZoneEvent::NameChanged {
                            zone,
                            name: name.to_string(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            NotificationRoute::ZoneSource => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let source = crate::model::types::SOURCE_IDENTIFIERS
                    .validate(capture_u32(&captures, 2)?)?;
                let change = self.zone_mut(zone).set_source(source)?;
                if change.is_changed() {
                    emitter.emit(ZoneEvent::SourceChanged { zone, source }.into());
                }
                Ok(change)
            }
            NotificationRoute::ZoneSourceAll => {
                let source = crate::model::types::SOURCE_IDENTIFIERS
                    .validate(capture_u32(&captures, 1)?)?;
                let mut overall = Change::AlreadySet;
                for zone in ZONE_IDENTIFIERS.iter() {
                    let change = self.zone_mut(zone).set_source(source)?;
                    if change.is_changed() {
                        overall = Change::Changed;
                        emitter.emit(ZoneEvent::SourceChanged { zone, source }.into());
                    }
                }
                Ok(overall)
            }
            NotificationRoute::ZoneVolume => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let volume = VolumeLevel::new(capture_i16(&captures, 2)?)?;
                let change = self.zone_mut(zone).set_volume(volume);
                if change.is_changed() {
                    emitter.emit(
                        ZoneEvent::VolumeChanged {
                            zone,
                            level: volume.get(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            NotificationRoute::ZoneVolumeAll => {
                let volume = VolumeLevel::new(capture_i16(&captures, 1)?)?;
                let mut overall = Change::AlreadySet;
                for zone in ZONE_IDENTIFIERS.iter() {
                    if self.zone_mut(zone).set_volume(volume).is_changed() {
                        overall = Change::Changed;
                        emitter.emit(
                            ZoneEvent::VolumeChanged {
                                zone,
                                level: volume.get(),
                            }
                            .into(),
                        );
                    }
                }
                Ok(overall)
            }
            NotificationRoute::ZoneVolumeFixed => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let fixed = capture_flag(&captures, 2)?;
                let change = self.zone_mut(zone).set_volume_fixed(fixed);
                if change.is_changed() {
                    emitter.emit(ZoneEvent::VolumeFixedChanged { zone, fixed }.into());
                }
                Ok(change)
            }
            NotificationRoute::ZoneMute => {
                let muted = capture_flag(&captures, 1)?;
                let zone = self.validate_zone(capture_u32(&captures, 2)?)?;
                let change = self.zone_mut(zone).set_mute(muted);
                if change.is_changed() {
                    emitter.emit(ZoneEvent::MuteChanged { zone, muted }.into());
                }
                Ok(change)
            }
            NotificationRoute::ZoneSoundMode => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let mode = SoundMode::from_wire(capture_u32(&captures, 2)?)?;
                let change = self.zone_mut(zone).set_sound_mode(mode);
                if change.is_changed() {
                    emitter.emit(ZoneEvent::SoundModeChanged { zone, mode }.into());
                }
                Ok(change)
            }
            NotificationRoute::ZoneEqualizerBand => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let band = crate::model::types::EQUALIZER_BAND_IDENTIFIERS
                    .validate(capture_u32(&captures, 2)?)?;
                let level = BandLevel::new(capture_i16(&captures, 3)?)?;
                let change = self.zone_mut(zone).set_equalizer_band(band, level)?;
                if change.is_changed() {
                    emitter.emit(
                        ZoneEvent::EqualizerBandChanged {
                            zone,
                            band,
                            level: level.get(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            NotificationRoute::ZoneEqualizerPreset => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let preset = crate::model::types::EQUALIZER_PRESET_IDENTIFIERS
                    .validate(capture_u32(&captures, 2)?)?;
                let change = self.zone_mut(zone).set_equalizer_preset(preset)?;
                if change.is_changed() {
                    emitter.emit(ZoneEvent::EqualizerPresetChanged { zone, preset }.into());
                }
                Ok(change)
            }
            NotificationRoute::ZoneTone => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let bass = ToneLevel::new(capture_i16(&captures, 2)?)?;
                let treble = ToneLevel::new(capture_i16(&captures, 3)?)?;
                let change = self.zone_mut(zone).set_tone(bass, treble);
                if change.is_changed() {
                    emitter.emit(
                        ZoneEvent::ToneChanged {
                            zone,
                            bass: bass.get(),
                            treble: treble.get(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            NotificationRoute::ZoneHighpass => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let frequency = CrossoverFrequency::new(capture_u32(&captures, 2)?)?;
                let change = self.zone_mut(zone).set_highpass(frequency);
                if change.is_changed() {
                    emitter.emit(
                        ZoneEvent::HighpassChanged {
                            zone,
                            frequency: frequency.get(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            NotificationRoute::ZoneLowpass => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let frequency = CrossoverFrequency::new(capture_u32(&captures, 2)?)?;
                let change = self.zone_mut(zone).set_lowpass(frequency);
                if change.is_changed() {
                    emitter.emit(
                        ZoneEvent::LowpassChanged {
                            zone,
                            frequency: frequency.get(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            NotificationRoute::ZoneBalance => {
                let zone = self.validate_zone(capture_u32(&captures, 1)?)?;
                let balance: BalanceLevel = vocab::balance_from_wire(
                    capture_str(&captures, 2)?,
                    capture_i16(&captures, 3)?,
                )?;
                let change = self.zone_mut(zone).set_balance(balance);
                if change.is_changed() {
                    emitter.emit(
                        ZoneEvent::BalanceChanged {
                            zone,
                            balance: balance.get(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            _ => Err(ProxyError::BadCommand("route misdirected to zones".into())),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Group intents
    // ─────────────────────────────────────────────────────────────────────

    /// Translates a group broadcast intent into one upstream mutation per
    /// member zone. Completions broadcast per-zone notifications to every
    /// downstream connection.
    pub fn apply_group_intent(
        &mut self,
        client: &mut ClientCommandManager,
        members: &[u8],
        intent: GroupIntent,
    ) {
        for &zone in members {
            let (request, expected, route) = match intent {
                GroupIntent::SetVolume { level } => match VolumeLevel::new(level) {
                    Ok(volume) => (
                        vocab::set_volume_request(zone, volume),
                        &vocab::VOLUME_RESPONSE,
                        NotificationRoute::ZoneVolume,
                    ),
                    Err(_) => continue,
                },
                GroupIntent::VolumeUp => (
                    vocab::volume_up_request(zone),
                    &vocab::VOLUME_RESPONSE,
                    NotificationRoute::ZoneVolume,
                ),
                GroupIntent::VolumeDown => (
                    vocab::volume_down_request(zone),
                    &vocab::VOLUME_RESPONSE,
                    NotificationRoute::ZoneVolume,
                ),
                GroupIntent::SetMute { muted } => (
                    if muted {
                        vocab::mute_request(zone)
                    } else {
                        vocab::unmute_request(zone)
                    },
                    &vocab::MUTE_RESPONSE,
                    NotificationRoute::ZoneMute,
                ),
                GroupIntent::ToggleMute => (
                    vocab::toggle_mute_request(zone),
                    &vocab::MUTE_RESPONSE,
                    NotificationRoute::ZoneMute,
                ),
                GroupIntent::SetSource { source } => (
                    vocab::set_source_request(zone, source),
                    &vocab::SOURCE_RESPONSE,
                    NotificationRoute::ZoneSource,
                ),
            };
            self.basis.proxy_mutation(client, None, request, expected, route);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Refresh
    // ─────────────────────────────────────────────────────────────────────

    /// Queues one full query per zone.
    pub fn refresh(&self, client: &mut ClientCommandManager) -> usize {
        for zone in ZONE_IDENTIFIERS.iter() {
            self.basis.proxy_refresh(
                client,
                RefreshFamily::Zones,
                vocab::query_request(zone),
                ResponseMatcher::Bundle {
                    parts: ZONE_QUERY_PARTS,
                    terminator: &vocab::QUERY_REQUEST,
                },
                None,
            );
        }
        usize::from(ZONE_IDENTIFIERS.max())
    }
}

impl ObjectController for ZonesController {
    fn query_current_configuration(&self, buffer: &mut Vec<Record>) -> ProxyResult<()> {
        for zone in ZONE_IDENTIFIERS.iter() {
            buffer.extend(self.snapshot(zone)?);
        }
        Ok(())
    }
}
