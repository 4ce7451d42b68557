//! Front panel controller.
//!
//! The device answers the brightness and locked queries with the bare state
//! record, omitting the documented query echo. The proxy accepts that form
//! upstream and reproduces it downstream.

use regex::Captures;

use crate::client::{ClientCommandManager, ResponseMatcher};
use crate::controllers::basis::{ControllerBasis, ObjectController};
use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::controllers::EngineContext;
use crate::error::{ProxyError, ProxyResult};
use crate::events::{EventEmitter, FrontPanelEvent};
use crate::model::types::Brightness;
use crate::model::{Change, FrontPanelModel};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{capture_flag, capture_u32, front_panel as vocab};
use crate::refresh::RefreshFamily;
use crate::server::{ConnectionId, ServerCommandManager};

/// Controller for the front panel.
pub struct FrontPanelController {
    basis: ControllerBasis,
    panel: FrontPanelModel,
}

impl FrontPanelController {
    pub fn new(basis: ControllerBasis) -> Self {
        Self {
            basis,
            panel: FrontPanelModel::new(),
        }
    }

    pub fn register(server: &mut ServerCommandManager, client: &mut ClientCommandManager) {
        use RequestRoute as R;
        server.register_request(&vocab::QUERY_BRIGHTNESS_REQUEST, R::FrontPanelQueryBrightness);
        server.register_request(&vocab::QUERY_LOCKED_REQUEST, R::FrontPanelQueryLocked);
        server.register_request(&vocab::BRIGHTNESS_RESPONSE, R::FrontPanelSetBrightness);
        server.register_request(&vocab::LOCKED_RESPONSE, R::FrontPanelSetLocked);
        client.register_notification(
            &vocab::BRIGHTNESS_RESPONSE,
            NotificationRoute::FrontPanelBrightness,
        );
        client.register_notification(&vocab::LOCKED_RESPONSE, NotificationRoute::FrontPanelLocked);
    }

    pub fn model(&self) -> &FrontPanelModel {
        &self.panel
    }

    pub fn on_query_brightness(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        match self.panel.brightness().map_err(ProxyError::from) {
            Ok(brightness) => {
                // State record only; the device omits the query echo.
                ctx.server
                    .send_record(origin, &vocab::brightness_response(brightness));
                Ok(())
            }
            Err(error) if error.is_not_initialized() && !reproxied => {
                self.basis.proxy_observation(
                    ctx.client,
                    origin,
                    record.clone(),
                    ResponseMatcher::Single(&vocab::BRIGHTNESS_RESPONSE),
                    RequestRoute::FrontPanelQueryBrightness,
                    Some(NotificationRoute::FrontPanelBrightness),
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    pub fn on_query_locked(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        match self.panel.locked().map_err(ProxyError::from) {
            Ok(locked) => {
                ctx.server.send_record(origin, &vocab::locked_response(locked));
                Ok(())
            }
            Err(error) if error.is_not_initialized() && !reproxied => {
                self.basis.proxy_observation(
                    ctx.client,
                    origin,
                    record.clone(),
                    ResponseMatcher::Single(&vocab::LOCKED_RESPONSE),
                    RequestRoute::FrontPanelQueryLocked,
                    Some(NotificationRoute::FrontPanelLocked),
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    pub fn on_set_brightness(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        let raw = capture_u32(captures, 1)?;
        Brightness::new(
            u8::try_from(raw).map_err(|_| ProxyError::OutOfRange("front panel brightness"))?,
        )?;
        self.basis.proxy_mutation(
            ctx.client,
            Some(origin),
            record.clone(),
            &vocab::BRIGHTNESS_RESPONSE,
            NotificationRoute::FrontPanelBrightness,
        );
        Ok(())
    }

    pub fn on_set_locked(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        capture_flag(captures, 1)?;
        self.basis.proxy_mutation(
            ctx.client,
            Some(origin),
            record.clone(),
            &vocab::LOCKED_RESPONSE,
            NotificationRoute::FrontPanelLocked,
        );
        Ok(())
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
            NotificationRoute::FrontPanelBrightness => {
                let captures = vocab::BRIGHTNESS_RESPONSE
                    .matches(body)
                    .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
                let raw = capture_u32(&captures, 1)?;
                let brightness = Brightness::new(
                    u8::try_from(raw)
                        .map_err(|_| ProxyError::OutOfRange("front panel brightness"))?,
                )?;
                let change = self.panel.set_brightness(brightness);
                if change.is_changed() {
                    emitter.emit(
                        FrontPanelEvent::BrightnessChanged {
                            brightness: brightness.get(),
                        }
                        .into(),
                    );
                }
                Ok(change)
            }
            NotificationRoute::FrontPanelLocked => {
                let captures = vocab::LOCKED_RESPONSE
                    .matches(body)
                    .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
                let locked = capture_flag(&captures, 1)?;
                let change = self.panel.set_locked(locked);
                if change.is_changed() {
                    emitter.emit(FrontPanelEvent::LockedChanged { locked }.into());
                }
                Ok(change)
            }
            _ => Err(ProxyError::BadCommand(
                "route misdirected to front panel".into(),
            )),
        }
    }

    /// Queues the two front panel state queries.
    pub fn refresh(&self, client: &mut ClientCommandManager) -> usize {
        self.basis.proxy_refresh(
            client,
            RefreshFamily::FrontPanel,
            vocab::query_brightness_request(),
            ResponseMatcher::Single(&vocab::BRIGHTNESS_RESPONSE),
            Some(NotificationRoute::FrontPanelBrightness),
        );
        self.basis.proxy_refresh(
            client,
            RefreshFamily::FrontPanel,
            vocab::query_locked_request(),
            ResponseMatcher::Single(&vocab::LOCKED_RESPONSE),
            Some(NotificationRoute::FrontPanelLocked),
        );
        2
    }
}

impl ObjectController for FrontPanelController {
    fn query_current_configuration(&self, buffer: &mut Vec<Record>) -> ProxyResult<()> {
        buffer.push(vocab::brightness_response(self.panel.brightness()?));
        buffer.push(vocab::locked_response(self.panel.locked()?));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventEmitter;
    use tokio::sync::mpsc;
    use tokio::time::Duration;

    fn controller() -> FrontPanelController {
        FrontPanelController::new(ControllerBasis::new(Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn initialized_query_replies_with_the_bare_state_record() {
        let mut panel = controller();
        panel
            .apply_notification(
                NotificationRoute::FrontPanelLocked,
                &Record::from("FPL1"),
                &NoopEventEmitter,
            )
            .unwrap();

        let mut client = ClientCommandManager::new();
        let mut server = ServerCommandManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.connection_opened(1, tx);
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        panel
            .on_query_locked(&mut ctx, 1, &Record::from("QFPL"), false)
            .unwrap();
        let bytes = rx.try_recv().unwrap();
        // No `QFPL` echo, matching the device quirk.
        assert_eq!(&bytes[..], b"(FPL1)\r\n");
    }

    #[tokio::test]
    async fn uninitialized_query_forwards_with_a_state_form_matcher() {
        let mut panel = controller();
        let mut client = ClientCommandManager::new();
        let mut server = ServerCommandManager::new();
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        panel
            .on_query_brightness(&mut ctx, 1, &Record::from("QFPB"), false)
            .unwrap();
        assert_eq!(client.pending_exchanges(), 1);
    }

    #[test]
    fn brightness_bounds_are_enforced() {
        let mut panel = controller();
        let result = panel.apply_notification(
            NotificationRoute::FrontPanelBrightness,
            &Record::from("FPB7"),
            &NoopEventEmitter,
        );
        assert!(matches!(result, Err(ProxyError::OutOfRange(_))));
    }
}
