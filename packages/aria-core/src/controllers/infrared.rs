//! Infrared controller.
//!
//! Shares the front panel's no-echo query quirk: the `IRL` state record is
//! the whole response to `QIRL`.

use regex::Captures;

use crate::client::{ClientCommandManager, ResponseMatcher};
use crate::controllers::basis::{ControllerBasis, ObjectController};
use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::controllers::EngineContext;
use crate::error::{ProxyError, ProxyResult};
use crate::events::{EventEmitter, InfraredEvent};
use crate::model::{Change, InfraredModel};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{capture_flag, infrared as vocab};
use crate::refresh::RefreshFamily;
use crate::server::{ConnectionId, ServerCommandManager};

/// Controller for the infrared receiver.
pub struct InfraredController {
    basis: ControllerBasis,
    infrared: InfraredModel,
}

impl InfraredController {
    pub fn new(basis: ControllerBasis) -> Self {
        Self {
            basis,
            infrared: InfraredModel::new(),
        }
    }

    pub fn register(server: &mut ServerCommandManager, client: &mut ClientCommandManager) {
        server.register_request(&vocab::QUERY_REQUEST, RequestRoute::InfraredQuery);
        server.register_request(&vocab::DISABLED_RESPONSE, RequestRoute::InfraredSet);
        client.register_notification(&vocab::DISABLED_RESPONSE, NotificationRoute::InfraredDisabled);
    }

    pub fn model(&self) -> &InfraredModel {
        &self.infrared
    }

    pub fn on_query(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        match self.infrared.disabled().map_err(ProxyError::from) {
            Ok(disabled) => {
                ctx.server
                    .send_record(origin, &vocab::disabled_response(disabled));
                Ok(())
            }
            Err(error) if error.is_not_initialized() && !reproxied => {
                self.basis.proxy_observation(
                    ctx.client,
                    origin,
                    record.clone(),
                    ResponseMatcher::Single(&vocab::DISABLED_RESPONSE),
                    RequestRoute::InfraredQuery,
                    Some(NotificationRoute::InfraredDisabled),
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    pub fn on_set_disabled(
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
            &vocab::DISABLED_RESPONSE,
            NotificationRoute::InfraredDisabled,
        );
        Ok(())
    }

    pub fn apply_notification(
        &mut self,
        record: &Record,
        emitter: &dyn EventEmitter,
    ) -> ProxyResult<Change> {
        let body = record
            .body_str()
            .ok_or_else(|| ProxyError::BadCommand("non-text record".into()))?;
        let captures = vocab::DISABLED_RESPONSE
            .matches(body)
            .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
        let disabled = capture_flag(&captures, 1)?;
        let change = self.infrared.set_disabled(disabled);
        if change.is_changed() {
            emitter.emit(InfraredEvent::DisabledChanged { disabled }.into());
        }
        Ok(change)
    }

    /// Queues the single infrared state query.
    pub fn refresh(&self, client: &mut ClientCommandManager) -> usize {
        self.basis.proxy_refresh(
            client,
            RefreshFamily::Infrared,
            vocab::query_request(),
            ResponseMatcher::Single(&vocab::DISABLED_RESPONSE),
            Some(NotificationRoute::InfraredDisabled),
        );
        1
    }
}

impl ObjectController for InfraredController {
    fn query_current_configuration(&self, buffer: &mut Vec<Record>) -> ProxyResult<()> {
        buffer.push(vocab::disabled_response(self.infrared.disabled()?));
        Ok(())
    }
}
