//! Equalizer presets controller.
//!
//! A preset observation is synthesized locally once the preset's name and
//! every band level have been seen; otherwise it is forwarded and re-entered
//! after the response bundle populates the model. Band and name mutations
//! are forwarded; preset `EQB` responses are disambiguated from zone bands
//! by the exchange's own part table.

use regex::Captures;

use crate::client::{BundlePart, ClientCommandManager, ResponseMatcher};
use crate::controllers::basis::{ControllerBasis, ObjectController};
use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::controllers::EngineContext;
use crate::error::{ProxyError, ProxyResult};
use crate::events::{EqualizerPresetEvent, EventEmitter};
use crate::model::types::{
    BandLevel, Name, EQUALIZER_BANDS_MAX, EQUALIZER_BAND_IDENTIFIERS,
    EQUALIZER_PRESET_IDENTIFIERS,
};
use crate::model::{Change, EqualizerPresetModel};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{
    capture_i16, capture_str, capture_u32, equalizer_presets as vocab, zones,
};
use crate::refresh::RefreshFamily;
use crate::server::{ConnectionId, ServerCommandManager};

static PRESET_QUERY_PARTS: &[BundlePart] = &[
    BundlePart {
        pattern: &vocab::NAME_RESPONSE,
        route: NotificationRoute::PresetName,
    },
    BundlePart {
        pattern: &zones::EQUALIZER_BAND_RESPONSE,
        route: NotificationRoute::PresetBand,
    },
];

/// Controller for the equalizer preset object family.
pub struct EqualizerPresetsController {
    basis: ControllerBasis,
    presets: Vec<EqualizerPresetModel>,
}

impl EqualizerPresetsController {
    pub fn new(basis: ControllerBasis) -> Self {
        Self {
            basis,
            presets: EQUALIZER_PRESET_IDENTIFIERS
                .iter()
                .map(EqualizerPresetModel::new)
                .collect(),
        }
    }

    pub fn register(server: &mut ServerCommandManager, client: &mut ClientCommandManager) {
        use RequestRoute as R;
        server.register_request(&vocab::QUERY_REQUEST, R::PresetQuery);
        server.register_request(&vocab::NAME_RESPONSE, R::PresetSetName);
        server.register_request(&vocab::SET_BAND_REQUEST, R::PresetSetBand);
        server.register_request(&vocab::BAND_UP_REQUEST, R::PresetBandUp);
        server.register_request(&vocab::BAND_DOWN_REQUEST, R::PresetBandDown);
        // Unsolicited EQB records route to the zones controller; only the
        // name form is registered here.
        client.register_notification(&vocab::NAME_RESPONSE, NotificationRoute::PresetName);
    }

    fn validate_preset(&self, raw: u32) -> ProxyResult<u8> {
        Ok(EQUALIZER_PRESET_IDENTIFIERS.validate(raw)?)
    }

    fn preset(&self, preset: u8) -> &EqualizerPresetModel {
        &self.presets[usize::from(preset) - 1]
    }

    pub fn model(&self, preset: u8) -> ProxyResult<&EqualizerPresetModel> {
        let preset = EQUALIZER_PRESET_IDENTIFIERS.validate(u32::from(preset))?;
        Ok(self.preset(preset))
    }

    fn snapshot(&self, preset: u8) -> ProxyResult<Vec<Record>> {
        let model = self.preset(preset);
        let mut records = Vec::with_capacity(usize::from(EQUALIZER_BANDS_MAX) + 1);
        records.push(vocab::name_response(preset, model.name()?));
        for band in 1..=EQUALIZER_BANDS_MAX {
            records.push(zones::equalizer_band_response(preset, band, model.band(band)?));
        }
        Ok(records)
    }

    pub fn on_query(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        let preset = self.validate_preset(capture_u32(captures, 1)?)?;
        match self.snapshot(preset) {
            Ok(mut records) => {
                records.push(record.clone());
                ctx.server.send_records(origin, &records);
                Ok(())
            }
            Err(error) if error.is_not_initialized() && !reproxied => {
                self.basis.proxy_observation(
                    ctx.client,
                    origin,
                    record.clone(),
                    ResponseMatcher::Bundle {
                        parts: PRESET_QUERY_PARTS,
                        terminator: &vocab::QUERY_REQUEST,
                    },
                    RequestRoute::PresetQuery,
                    None,
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    pub fn on_set_name(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_preset(capture_u32(captures, 1)?)?;
        Name::new(capture_str(captures, 2)?)?;
        self.basis.proxy_mutation(
            ctx.client,
            Some(origin),
            record.clone(),
            &vocab::NAME_RESPONSE,
            NotificationRoute::PresetName,
        );
        Ok(())
    }

    pub fn on_set_band(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_preset(capture_u32(captures, 1)?)?;
        EQUALIZER_BAND_IDENTIFIERS.validate(capture_u32(captures, 2)?)?;
        BandLevel::new(capture_i16(captures, 3)?)?;
        self.forward_band(ctx, origin, record);
        Ok(())
    }

    pub fn on_adjust_band(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        self.validate_preset(capture_u32(captures, 1)?)?;
        EQUALIZER_BAND_IDENTIFIERS.validate(capture_u32(captures, 2)?)?;
        self.forward_band(ctx, origin, record);
        Ok(())
    }

    fn forward_band(&self, ctx: &mut EngineContext<'_>, origin: ConnectionId, record: &Record) {
        self.basis.proxy_mutation(
            ctx.client,
            Some(origin),
            record.clone(),
            &zones::EQUALIZER_BAND_RESPONSE,
            NotificationRoute::PresetBand,
        );
    }

    pub fn apply_notification(
        &mut self,
        route: NotificationRoute,
        record: &Record,
        emitter: &dyn EventEmitter,
    ) -> ProxyResult<Change> {
        let body = record
            .body_str()
            .ok_or_else(|| ProxyError::BadCommand("non-text record".into()))?;
        match route {
            NotificationRoute::PresetName => {
                let captures = vocab::NAME_RESPONSE
                    .matches(body)
                    .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
                let preset = self.validate_preset(capture_u32(&captures, 1)?)?;
                let name = Name::new(capture_str(&captures, 2)?)?;
                let change = self.presets[usize::from(preset) - 1].set_name(name.clone());
                if change.is_changed() {
                    emitter.emit(
                        EqualizerPresetEvent::NameChanged {
                            preset,
                            name: name.to_string(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            NotificationRoute::PresetBand => {
                let captures = zones::EQUALIZER_BAND_RESPONSE
                    .matches(body)
                    .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
                let preset = self.validate_preset(capture_u32(&captures, 1)?)?;
                let band = EQUALIZER_BAND_IDENTIFIERS.validate(capture_u32(&captures, 2)?)?;
                let level = BandLevel::new(capture_i16(&captures, 3)?)?;
                let change = self.presets[usize::from(preset) - 1].set_band(band, level)?;
                if change.is_changed() {
                    emitter.emit(
                        EqualizerPresetEvent::BandChanged {
                            preset,
                            band,
                            level: level.get(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            _ => Err(ProxyError::BadCommand(
                "route misdirected to equalizer presets".into(),
            )),
        }
    }

    /// Queues one full query per preset.
    pub fn refresh(&self, client: &mut ClientCommandManager) -> usize {
        for preset in EQUALIZER_PRESET_IDENTIFIERS.iter() {
            self.basis.proxy_refresh(
                client,
                RefreshFamily::EqualizerPresets,
                vocab::query_request(preset),
                ResponseMatcher::Bundle {
                    parts: PRESET_QUERY_PARTS,
                    terminator: &vocab::QUERY_REQUEST,
                },
                None,
            );
        }
        usize::from(EQUALIZER_PRESET_IDENTIFIERS.max())
    }
}

impl ObjectController for EqualizerPresetsController {
    fn query_current_configuration(&self, buffer: &mut Vec<Record>) -> ProxyResult<()> {
        for preset in EQUALIZER_PRESET_IDENTIFIERS.iter() {
            buffer.extend(self.snapshot(preset)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventEmitter;
    use tokio::sync::mpsc;
    use tokio::time::Duration;

    fn controller() -> EqualizerPresetsController {
        EqualizerPresetsController::new(ControllerBasis::new(Duration::from_secs(5)))
    }

    fn populate(presets: &mut EqualizerPresetsController, preset: u8) {
        presets
            .apply_notification(
                NotificationRoute::PresetName,
                &Record::from(format!("NEP{preset},Rock")),
                &NoopEventEmitter,
            )
            .unwrap();
        for band in 1..=EQUALIZER_BANDS_MAX {
            presets
                .apply_notification(
                    NotificationRoute::PresetBand,
                    &Record::from(format!("EQB{preset},{band},2")),
                    &NoopEventEmitter,
                )
                .unwrap();
        }
    }

    #[tokio::test]
    async fn initialized_query_synthesizes_name_bands_and_terminator() {
        let mut presets = controller();
        populate(&mut presets, 2);

        let mut client = ClientCommandManager::new();
        let mut server = ServerCommandManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.connection_opened(1, tx);
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        let captures = vocab::QUERY_REQUEST.matches("QEP2").unwrap();
        presets
            .on_query(&mut ctx, 1, &captures, &Record::from("QEP2"), false)
            .unwrap();

        let bytes = rx.try_recv().unwrap();
        let text = std::str::from_utf8(&bytes).unwrap();
        assert!(text.starts_with("(NEP2,Rock)\r\n(EQB2,1,2)\r\n"));
        assert!(text.ends_with("(EQB2,10,2)\r\n(QEP2)\r\n"));
        assert_eq!(client.pending_exchanges(), 0);
    }

    #[tokio::test]
    async fn uninitialized_query_forwards_once() {
        let mut presets = controller();
        let mut client = ClientCommandManager::new();
        let mut server = ServerCommandManager::new();
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        let captures = vocab::QUERY_REQUEST.matches("QEP1").unwrap();
        presets
            .on_query(&mut ctx, 1, &captures, &Record::from("QEP1"), false)
            .unwrap();
        assert_eq!(client.pending_exchanges(), 1);
    }

    #[test]
    fn preset_band_records_update_the_preset_not_a_zone() {
        let mut presets = controller();
        let change = presets
            .apply_notification(
                NotificationRoute::PresetBand,
                &Record::from("EQB3,5,-4"),
                &NoopEventEmitter,
            )
            .unwrap();
        assert!(change.is_changed());
        assert_eq!(presets.model(3).unwrap().band(5).unwrap().get(), -4);
    }
}
