//! Sources controller.
//!
//! Read-mostly: observations are satisfied from the local model once the
//! refresh wave (or a fallback observation) has seen the names. Name writes
//! are forwarded; the upstream name notification form updates the model on
//! completion.

use regex::Captures;

use crate::client::{BundlePart, ClientCommandManager, ResponseMatcher};
use crate::controllers::basis::{ControllerBasis, ObjectController};
use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::controllers::EngineContext;
use crate::error::{ProxyError, ProxyResult};
use crate::events::{EventEmitter, SourceEvent};
use crate::model::types::{Name, SOURCE_IDENTIFIERS};
use crate::model::{Change, SourceModel};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{capture_str, capture_u32, sources as vocab};
use crate::refresh::RefreshFamily;
use crate::server::{ConnectionId, ServerCommandManager};

static SOURCE_QUERY_PARTS: &[BundlePart] = &[BundlePart {
    pattern: &vocab::NAME_RESPONSE,
    route: NotificationRoute::SourceName,
}];

/// Controller for the source object family.
pub struct SourcesController {
    basis: ControllerBasis,
    sources: Vec<SourceModel>,
}

impl SourcesController {
    pub fn new(basis: ControllerBasis) -> Self {
        Self {
            basis,
            sources: SOURCE_IDENTIFIERS.iter().map(SourceModel::new).collect(),
        }
    }

    pub fn register(server: &mut ServerCommandManager, client: &mut ClientCommandManager) {
        server.register_request(&vocab::QUERY_REQUEST, RequestRoute::SourceQuery);
        server.register_request(&vocab::NAME_RESPONSE, RequestRoute::SourceSetName);
        client.register_notification(&vocab::NAME_RESPONSE, NotificationRoute::SourceName);
    }

    fn validate_source(&self, raw: u32) -> ProxyResult<u8> {
        Ok(SOURCE_IDENTIFIERS.validate(raw)?)
    }

    fn source(&self, source: u8) -> &SourceModel {
        &self.sources[usize::from(source) - 1]
    }

    pub fn model(&self, source: u8) -> ProxyResult<&SourceModel> {
        let source = SOURCE_IDENTIFIERS.validate(u32::from(source))?;
        Ok(self.source(source))
    }

    pub fn on_query(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        let source = self.validate_source(capture_u32(captures, 1)?)?;
        match self.source(source).name().map_err(ProxyError::from) {
            Ok(name) => {
                ctx.server.send_records(
                    origin,
                    &[vocab::name_response(source, name), record.clone()],
                );
                Ok(())
            }
            Err(error) if error.is_not_initialized() && !reproxied => {
                self.basis.proxy_observation(
                    ctx.client,
                    origin,
                    record.clone(),
                    ResponseMatcher::Bundle {
                        parts: SOURCE_QUERY_PARTS,
                        terminator: &vocab::QUERY_REQUEST,
                    },
                    RequestRoute::SourceQuery,
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
        self.validate_source(capture_u32(captures, 1)?)?;
        Name::new(capture_str(captures, 2)?)?;
        self.basis.proxy_mutation(
            ctx.client,
            Some(origin),
            record.clone(),
            &vocab::NAME_RESPONSE,
            NotificationRoute::SourceName,
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
        let captures = vocab::NAME_RESPONSE
            .matches(body)
            .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
        let source = self.validate_source(capture_u32(&captures, 1)?)?;
        let name = Name::new(capture_str(&captures, 2)?)?;
        let change = self.sources[usize::from(source) - 1].set_name(name.clone());
        if change.is_changed() {
            emitter.emit(
                SourceEvent::NameChanged {
                    source,
                    name: name.to_string(),
                }
                .into(),
            );
        }
        Ok(change)
    }

    /// Queues one name query per source.
    pub fn refresh(&self, client: &mut ClientCommandManager) -> usize {
        for source in SOURCE_IDENTIFIERS.iter() {
            self.basis.proxy_refresh(
                client,
                RefreshFamily::Sources,
                vocab::query_request(source),
                ResponseMatcher::Bundle {
                    parts: SOURCE_QUERY_PARTS,
                    terminator: &vocab::QUERY_REQUEST,
                },
                None,
            );
        }
        usize::from(SOURCE_IDENTIFIERS.max())
    }
}

impl ObjectController for SourcesController {
    fn query_current_configuration(&self, buffer: &mut Vec<Record>) -> ProxyResult<()> {
        for model in &self.sources {
            buffer.push(vocab::name_response(model.identifier(), model.name()?));
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

    fn controller() -> SourcesController {
        SourcesController::new(ControllerBasis::new(Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn uninitialized_query_falls_back_to_upstream_once() {
        let mut sources = controller();
        let mut client = ClientCommandManager::new();
        let mut server = ServerCommandManager::new();
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        let captures = vocab::QUERY_REQUEST.matches("QI2").unwrap();

        sources
            .on_query(&mut ctx, 1, &captures, &Record::from("QI2"), false)
            .unwrap();
        assert_eq!(client.pending_exchanges(), 1);

        // Re-entry with the model still empty must not loop.
        let captures = vocab::QUERY_REQUEST.matches("QI2").unwrap();
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        let result = sources.on_query(&mut ctx, 1, &captures, &Record::from("QI2"), true);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn initialized_query_is_answered_locally() {
        let mut sources = controller();
        sources
            .apply_notification(&Record::from("NI2,Tuner"), &NoopEventEmitter)
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
        let captures = vocab::QUERY_REQUEST.matches("QI2").unwrap();
        sources
            .on_query(&mut ctx, 1, &captures, &Record::from("QI2"), false)
            .unwrap();

        assert_eq!(client.pending_exchanges(), 0);
        let bytes = rx.try_recv().unwrap();
        assert_eq!(&bytes[..], b"(NI2,Tuner)\r\n(QI2)\r\n");
    }

    #[test]
    fn repeated_name_notification_is_silent() {
        let mut sources = controller();
        let emitter = NoopEventEmitter;
        let change = sources
            .apply_notification(&Record::from("NI1,Stream"), &emitter)
            .unwrap();
        assert!(change.is_changed());
        let change = sources
            .apply_notification(&Record::from("NI1,Stream"), &emitter)
            .unwrap();
        assert!(!change.is_changed());
    }
}
