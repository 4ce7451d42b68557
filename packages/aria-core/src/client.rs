//! Upstream command manager.
//!
//! Owns the single upstream session contract: at most one request/response
//! exchange is outstanding at a time; further exchanges queue in FIFO order.
//! Bytes arriving from upstream are matched first against the outstanding
//! exchange's expected response, then against registered notification
//! patterns in registration order; anything else is logged and discarded.
//!
//! Completions are a tagged enum with the controller identity embedded by
//! construction; the in-flight slot is their single owner, and ownership
//! ends in exactly one of the completion or error paths.

use std::collections::VecDeque;

use bytes::Bytes;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant};

use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::error::ProxyError;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{Pattern, ERROR_RESPONSE};
use crate::refresh::RefreshFamily;
use crate::server::ConnectionId;

/// One allowed interior record of a multi-record response, with the route
/// that applies it to the model.
#[derive(Debug, Clone, Copy)]
pub struct BundlePart {
    pub pattern: &'static Pattern,
    pub route: NotificationRoute,
}

/// How an exchange recognizes its response.
#[derive(Debug, Clone, Copy)]
pub enum ResponseMatcher {
    /// The response is a single record (mutations; the no-echo query quirk).
    Single(&'static Pattern),
    /// The response is a record bundle closed by a terminator record.
    /// Interior records are applied to the model as they arrive; they are
    /// not notifications and are not fanned out.
    Bundle {
        parts: &'static [BundlePart],
        terminator: &'static Pattern,
    },
}

/// What to do when an exchange's response (or failure) arrives.
#[derive(Debug, Clone)]
pub enum Completion {
    /// A forwarded mutation: parse the response via `route`, reply verbatim
    /// to the originator, broadcast to the others when the model changed.
    /// Internally originated mutations (group intents) have no originator.
    Mutation {
        origin: Option<ConnectionId>,
        route: NotificationRoute,
    },
    /// A forwarded observation: interior records populated the model; the
    /// original request is re-dispatched to its local handler.
    Observation {
        origin: ConnectionId,
        route: RequestRoute,
        request: Record,
        /// Route that applies the completing record itself to the model.
        /// Used when the response *is* state (the no-echo query quirk, and
        /// bundle terminators such as the network `SDDP` record).
        apply: Option<NotificationRoute>,
    },
    /// One query of the bootstrap wave.
    Refresh {
        family: RefreshFamily,
        /// Route for single-record responses (the no-echo quirk); bundle
        /// responses populate the model through their parts instead.
        route: Option<NotificationRoute>,
    },
}

/// One request plus its single expected response.
#[derive(Debug)]
pub struct Exchange {
    pub request: Record,
    pub matcher: ResponseMatcher,
    pub timeout: Duration,
    pub completion: Completion,
}

/// An exchange that ended in an error; the engine turns these into
/// downstream `(ERROR)` responses or refresh bookkeeping.
#[derive(Debug)]
pub struct FailedExchange {
    pub completion: Completion,
    pub error: ProxyError,
}

/// Outcome of feeding one upstream record into the manager.
#[derive(Debug)]
pub enum ClientDispatch {
    /// The outstanding exchange completed.
    Completed {
        completion: Completion,
        response: Record,
    },
    /// The outstanding exchange failed with an upstream error frame.
    Failed(FailedExchange),
    /// An interior record of the outstanding bundle exchange.
    BundlePart {
        route: NotificationRoute,
        record: Record,
    },
    /// An unsolicited notification outside any exchange.
    Notification {
        route: NotificationRoute,
        record: Record,
    },
    /// Nothing matched; the record was discarded.
    Unmatched { record: Record },
}

#[derive(Debug)]
struct PendingExchange {
    exchange: Exchange,
    deadline: Instant,
}

/// Owns the upstream session: the in-flight exchange slot, the FIFO queue of
/// waiters, and the unsolicited-notification registry.
pub struct ClientCommandManager {
    upstream: Option<UnboundedSender<Bytes>>,
    in_flight: Option<PendingExchange>,
    queue: VecDeque<PendingExchange>,
    notifications: Vec<(&'static Pattern, NotificationRoute)>,
}

impl ClientCommandManager {
    pub fn new() -> Self {
        Self {
            upstream: None,
            in_flight: None,
            queue: VecDeque::new(),
            notifications: Vec::new(),
        }
    }

    /// True while an upstream writer is attached.
    pub fn is_connected(&self) -> bool {
        self.upstream.is_some()
    }

    /// Number of exchanges waiting or outstanding. Test hook.
    pub fn pending_exchanges(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight.is_some())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notification registry
    // ─────────────────────────────────────────────────────────────────────

    /// Registers an unsolicited-notification pattern. Patterns are tried in
    /// registration order; the first match wins.
    pub fn register_notification(&mut self, pattern: &'static Pattern, route: NotificationRoute) {
        self.notifications.push((pattern, route));
    }

    /// Unregisters a previously registered notification pattern.
    pub fn unregister_notification(&mut self, pattern: &'static Pattern) {
        self.notifications
            .retain(|(registered, _)| !std::ptr::eq(*registered, pattern));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Link lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Attaches the upstream writer and transmits any queued exchange.
    pub fn upstream_connected(&mut self, writer: UnboundedSender<Bytes>) {
        self.upstream = Some(writer);
        self.advance();
    }

    /// Detaches the upstream writer, cancelling every pending exchange with
    /// *link-down* in FIFO order.
    pub fn upstream_disconnected(&mut self) -> Vec<FailedExchange> {
        self.upstream = None;
        let mut failed = Vec::new();
        if let Some(pending) = self.in_flight.take() {
            failed.push(FailedExchange {
                completion: pending.exchange.completion,
                error: ProxyError::LinkDown,
            });
        }
        for pending in self.queue.drain(..) {
            failed.push(FailedExchange {
                completion: pending.exchange.completion,
                error: ProxyError::LinkDown,
            });
        }
        failed
    }

    // ─────────────────────────────────────────────────────────────────────
    // Exchange submission
    // ─────────────────────────────────────────────────────────────────────

    /// Submits one exchange. The deadline is armed immediately, so requests
    /// queued while the link is down still time out on schedule.
    pub fn send_command(&mut self, exchange: Exchange) {
        let deadline = Instant::now() + exchange.timeout;
        self.queue.push_back(PendingExchange { exchange, deadline });
        self.advance();
    }

    /// Transmits the queue head when the link is idle.
    fn advance(&mut self) {
        while self.in_flight.is_none() {
            let Some(writer) = self.upstream.as_ref() else {
                return;
            };
            let Some(pending) = self.queue.pop_front() else {
                return;
            };
            log::debug!(
                "[ClientCM] Sending `{}` upstream",
                pending.exchange.request.body_str().unwrap_or("<binary>")
            );
            if writer.send(pending.exchange.request.frame()).is_ok() {
                self.in_flight = Some(pending);
            } else {
                // Writer task is gone; a link-down event is imminent. Put
                // the exchange back so that event cancels it in order.
                log::warn!("[ClientCM] Upstream writer closed; holding exchange");
                self.queue.push_front(pending);
                self.upstream = None;
                return;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Response and notification matching
    // ─────────────────────────────────────────────────────────────────────

    /// Feeds one upstream record through the matching order: outstanding
    /// exchange first, then notification patterns, then discard.
    pub fn on_record(&mut self, record: Record) -> ClientDispatch {
        let Some(body) = record.body_str() else {
            return ClientDispatch::Unmatched { record };
        };

        let matcher = self
            .in_flight
            .as_ref()
            .map(|pending| pending.exchange.matcher);
        if let Some(matcher) = matcher {
            match matcher {
                ResponseMatcher::Single(pattern) => {
                    if pattern.matches(body).is_some() {
                        let pending = self.in_flight.take().expect("matcher came from the slot");
                        self.advance();
                        return ClientDispatch::Completed {
                            completion: pending.exchange.completion,
                            response: record,
                        };
                    }
                }
                ResponseMatcher::Bundle { parts, terminator } => {
                    if terminator.matches(body).is_some() {
                        let pending = self.in_flight.take().expect("matcher came from the slot");
                        self.advance();
                        return ClientDispatch::Completed {
                            completion: pending.exchange.completion,
                            response: record,
                        };
                    }
                    for part in parts {
                        if part.pattern.matches(body).is_some() {
                            return ClientDispatch::BundlePart {
                                route: part.route,
                                record,
                            };
                        }
                    }
                }
            }

            if ERROR_RESPONSE.matches(body).is_some() {
                let pending = self.in_flight.take().expect("matcher came from the slot");
                self.advance();
                return ClientDispatch::Failed(FailedExchange {
                    completion: pending.exchange.completion,
                    error: ProxyError::UpstreamError,
                });
            }
        }

        for (pattern, route) in &self.notifications {
            if pattern.matches(body).is_some() {
                return ClientDispatch::Notification {
                    route: *route,
                    record,
                };
            }
        }

        ClientDispatch::Unmatched { record }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Timeouts
    // ─────────────────────────────────────────────────────────────────────

    /// Earliest deadline among the outstanding and queued exchanges.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.in_flight
            .iter()
            .chain(self.queue.iter())
            .map(|pending| pending.deadline)
            .min()
    }

    /// Fails every exchange whose deadline has passed, advancing the queue.
    pub fn expire(&mut self, now: Instant) -> Vec<FailedExchange> {
        let mut failed = Vec::new();

        if self
            .in_flight
            .as_ref()
            .is_some_and(|pending| pending.deadline <= now)
        {
            let pending = self.in_flight.take().expect("checked above");
            log::warn!(
                "[ClientCM] Exchange `{}` timed out",
                pending.exchange.request.body_str().unwrap_or("<binary>")
            );
            failed.push(FailedExchange {
                completion: pending.exchange.completion,
                error: ProxyError::TimedOut,
            });
        }

        while let Some(position) = self
            .queue
            .iter()
            .position(|pending| pending.deadline <= now)
        {
            let pending = self
                .queue
                .remove(position)
                .expect("position from iterator is in range");
            failed.push(FailedExchange {
                completion: pending.exchange.completion,
                error: ProxyError::TimedOut,
            });
        }

        self.advance();
        failed
    }
}

impl Default for ClientCommandManager {
    fn default() -> Self {
        Self::new()
    }
}
