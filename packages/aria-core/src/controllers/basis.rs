//! Base behavior shared by every object controller.
//!
//! Three forwarding primitives plus the configuration-synthesis seam:
//!
//! 1. `proxy_mutation` forwards a mutation verbatim upstream; the
//!    completion parses the response as if it were an unsolicited
//!    notification, replies verbatim to the originator, and broadcasts to
//!    the other connections when the model changed.
//! 2. `proxy_observation` forwards an observation whose answer cannot be
//!    synthesized yet; interior response records populate the model and the
//!    completion re-dispatches the original request to its local handler.
//! 3. `proxy_refresh` submits one query of the bootstrap wave; it populates
//!    the model silently.
//!
//! The fourth primitive, [`ObjectController::query_current_configuration`],
//! is overridden by each controller to serialize its local state in the
//! device's notification forms.
//!
//! The exchange slot in the client command manager is the single owner of
//! each completion; an exchange resolves through exactly one of the
//! completion or error paths.

use tokio::time::Duration;

use crate::client::{ClientCommandManager, Completion, Exchange, ResponseMatcher};
use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::error::ProxyResult;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;
use crate::refresh::RefreshFamily;
use crate::server::ConnectionId;

/// Serialization seam used by the configuration dump.
pub trait ObjectController {
    /// Appends this controller's local state to `buffer` in the same framed
    /// forms the device uses for unsolicited notifications.
    fn query_current_configuration(&self, buffer: &mut Vec<Record>) -> ProxyResult<()>;
}

/// Shared state for the proxying primitives: the default exchange timeout.
#[derive(Debug, Clone, Copy)]
pub struct ControllerBasis {
    timeout: Duration,
}

impl ControllerBasis {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forwards a mutation verbatim upstream.
    ///
    /// `origin` is `None` for internally originated mutations (group
    /// intents); their completions broadcast to every connection instead of
    /// replying to one.
    pub fn proxy_mutation(
        &self,
        client: &mut ClientCommandManager,
        origin: Option<ConnectionId>,
        request: Record,
        expected: &'static Pattern,
        route: NotificationRoute,
    ) {
        client.send_command(Exchange {
            request,
            matcher: ResponseMatcher::Single(expected),
            timeout: self.timeout,
            completion: Completion::Mutation { origin, route },
        });
    }

    /// Forwards an observation the local model cannot answer yet. On
    /// completion the original request re-enters its local handler, which
    /// now synthesizes the reply from the populated model.
    pub fn proxy_observation(
        &self,
        client: &mut ClientCommandManager,
        origin: ConnectionId,
        request: Record,
        matcher: ResponseMatcher,
        route: RequestRoute,
        apply: Option<NotificationRoute>,
    ) {
        let upstream_request = request.clone();
        client.send_command(Exchange {
            request: upstream_request,
            matcher,
            timeout: self.timeout,
            completion: Completion::Observation {
                origin,
                route,
                request,
                apply,
            },
        });
    }

    /// Submits one bootstrap-wave query.
    pub fn proxy_refresh(
        &self,
        client: &mut ClientCommandManager,
        family: RefreshFamily,
        request: Record,
        matcher: ResponseMatcher,
        route: Option<NotificationRoute>,
    ) {
        client.send_command(Exchange {
            request,
            matcher,
            timeout: self.timeout,
            completion: Completion::Refresh { family, route },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::vocabulary::zones;

    #[test]
    fn mutation_exchanges_carry_the_configured_timeout() {
        let basis = ControllerBasis::new(Duration::from_millis(750));
        let mut client = ClientCommandManager::new();
        basis.proxy_mutation(
            &mut client,
            Some(4),
            Record::from("VZ1,-10"),
            &zones::VOLUME_RESPONSE,
            NotificationRoute::ZoneVolume,
        );
        assert_eq!(client.pending_exchanges(), 1);
        // Deadline is armed at submission even with no upstream attached.
        assert!(client.next_deadline().is_some());
    }
}
