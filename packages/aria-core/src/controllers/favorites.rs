//! Favorites controller.
//!
//! Same shape as the sources controller: local name observations with a
//! one-shot fallback, forwarded name writes.

use regex::Captures;

use crate::client::{BundlePart, ClientCommandManager, ResponseMatcher};
use crate::controllers::basis::{ControllerBasis, ObjectController};
use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::controllers::EngineContext;
use crate::error::{ProxyError, ProxyResult};
use crate::events::{EventEmitter, FavoriteEvent};
use crate::model::types::{Name, FAVORITE_IDENTIFIERS};
use crate::model::{Change, FavoriteModel};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{capture_str, capture_u32, favorites as vocab};
use crate::refresh::RefreshFamily;
use crate::server::{ConnectionId, ServerCommandManager};

static FAVORITE_QUERY_PARTS: &[BundlePart] = &[BundlePart {
    pattern: &vocab::NAME_RESPONSE,
    route: NotificationRoute::FavoriteName,
}];

/// Controller for the favorite object family.
pub struct FavoritesController {
    basis: ControllerBasis,
    favorites: Vec<FavoriteModel>,
}

impl FavoritesController {
    pub fn new(basis: ControllerBasis) -> Self {
        Self {
            basis,
            favorites: FAVORITE_IDENTIFIERS.iter().map(FavoriteModel::new).collect(),
        }
    }

    pub fn register(server: &mut ServerCommandManager, client: &mut ClientCommandManager) {
        server.register_request(&vocab::QUERY_REQUEST, RequestRoute::FavoriteQuery);
        server.register_request(&vocab::NAME_RESPONSE, RequestRoute::FavoriteSetName);
        client.register_notification(&vocab::NAME_RESPONSE, NotificationRoute::FavoriteName);
    }

    fn validate_favorite(&self, raw: u32) -> ProxyResult<u8> {
        Ok(FAVORITE_IDENTIFIERS.validate(raw)?)
    }

    fn favorite(&self, favorite: u8) -> &FavoriteModel {
        &self.favorites[usize::from(favorite) - 1]
    }

    pub fn model(&self, favorite: u8) -> ProxyResult<&FavoriteModel> {
        let favorite = FAVORITE_IDENTIFIERS.validate(u32::from(favorite))?;
        Ok(self.favorite(favorite))
    }

    pub fn on_query(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        let favorite = self.validate_favorite(capture_u32(captures, 1)?)?;
        match self.favorite(favorite).name().map_err(ProxyError::from) {
            Ok(name) => {
                ctx.server.send_records(
                    origin,
                    &[vocab::name_response(favorite, name), record.clone()],
                );
                Ok(())
            }
            Err(error) if error.is_not_initialized() && !reproxied => {
                self.basis.proxy_observation(
                    ctx.client,
                    origin,
                    record.clone(),
                    ResponseMatcher::Bundle {
                        parts: FAVORITE_QUERY_PARTS,
                        terminator: &vocab::QUERY_REQUEST,
                    },
                    RequestRoute::FavoriteQuery,
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
        self.validate_favorite(capture_u32(captures, 1)?)?;
        Name::new(capture_str(captures, 2)?)?;
        self.basis.proxy_mutation(
            ctx.client,
            Some(origin),
            record.clone(),
            &vocab::NAME_RESPONSE,
            NotificationRoute::FavoriteName,
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
        let favorite = self.validate_favorite(capture_u32(&captures, 1)?)?;
        let name = Name::new(capture_str(&captures, 2)?)?;
        let change = self.favorites[usize::from(favorite) - 1].set_name(name.clone());
        if change.is_changed() {
            emitter.emit(
                FavoriteEvent::NameChanged {
                    favorite,
                    name: name.to_string(),
                }
                .into(),
            );
        }
        Ok(change)
    }

    /// Queues one name query per favorite.
    pub fn refresh(&self, client: &mut ClientCommandManager) -> usize {
        for favorite in FAVORITE_IDENTIFIERS.iter() {
            self.basis.proxy_refresh(
                client,
                RefreshFamily::Favorites,
                vocab::query_request(favorite),
                ResponseMatcher::Bundle {
                    parts: FAVORITE_QUERY_PARTS,
                    terminator: &vocab::QUERY_REQUEST,
                },
                None,
            );
        }
        usize::from(FAVORITE_IDENTIFIERS.max())
    }
}

impl ObjectController for FavoritesController {
    fn query_current_configuration(&self, buffer: &mut Vec<Record>) -> ProxyResult<()> {
        for model in &self.favorites {
            buffer.push(vocab::name_response(model.identifier(), model.name()?));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventEmitter;
    use tokio::time::Duration;

    #[test]
    fn idempotent_name_notification_is_silent() {
        let mut favorites =
            FavoritesController::new(ControllerBasis::new(Duration::from_secs(5)));
        let change = favorites
            .apply_notification(&Record::from("NC1,Jazz"), &NoopEventEmitter)
            .unwrap();
        assert!(change.is_changed());
        let change = favorites
            .apply_notification(&Record::from("NC1,Jazz"), &NoopEventEmitter)
            .unwrap();
        assert!(!change.is_changed());
        assert_eq!(
            favorites.model(1).unwrap().name().unwrap().as_str(),
            "Jazz"
        );
    }

    #[test]
    fn out_of_range_identifier_is_rejected() {
        let mut favorites =
            FavoritesController::new(ControllerBasis::new(Duration::from_secs(5)));
        let result =
            favorites.apply_notification(&Record::from("NC11,Jazz"), &NoopEventEmitter);
        assert!(matches!(result, Err(ProxyError::OutOfRange(_))));
    }
}
