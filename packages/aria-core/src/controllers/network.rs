//! Network controller.
//!
//! The network query response contains both state and configuration
//! settings; the configuration dump contains only configuration settings and
//! omits the immutable `MAC` record. No mutations are exposed. The response
//! bundle has no query echo; the trailing `SDDP` record closes it.

use std::net::Ipv4Addr;

use crate::client::{BundlePart, ClientCommandManager, ResponseMatcher};
use crate::controllers::basis::{ControllerBasis, ObjectController};
use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::controllers::EngineContext;
use crate::error::{ProxyError, ProxyResult};
use crate::events::{EventEmitter, NetworkEvent};
use crate::model::network::MacAddress;
use crate::model::{Change, NetworkModel};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{capture_flag, capture_str, network as vocab};
use crate::refresh::RefreshFamily;
use crate::server::{ConnectionId, ServerCommandManager};

static NETWORK_QUERY_PARTS: &[BundlePart] = &[
    BundlePart {
        pattern: &vocab::DHCP_RESPONSE,
        route: NotificationRoute::NetworkDhcp,
    },
    BundlePart {
        pattern: &vocab::ADDRESS_RESPONSE,
        route: NotificationRoute::NetworkAddress,
    },
    BundlePart {
        pattern: &vocab::NETMASK_RESPONSE,
        route: NotificationRoute::NetworkNetmask,
    },
    BundlePart {
        pattern: &vocab::GATEWAY_RESPONSE,
        route: NotificationRoute::NetworkGateway,
    },
    BundlePart {
        pattern: &vocab::MAC_RESPONSE,
        route: NotificationRoute::NetworkMac,
    },
];

/// Controller for the device network interface.
pub struct NetworkController {
    basis: ControllerBasis,
    network: NetworkModel,
}

impl NetworkController {
    pub fn new(basis: ControllerBasis) -> Self {
        Self {
            basis,
            network: NetworkModel::new(),
        }
    }

    pub fn register(server: &mut ServerCommandManager, client: &mut ClientCommandManager) {
        use NotificationRoute as N;
        server.register_request(&vocab::QUERY_REQUEST, RequestRoute::NetworkQuery);
        client.register_notification(&vocab::DHCP_RESPONSE, N::NetworkDhcp);
        client.register_notification(&vocab::ADDRESS_RESPONSE, N::NetworkAddress);
        client.register_notification(&vocab::NETMASK_RESPONSE, N::NetworkNetmask);
        client.register_notification(&vocab::GATEWAY_RESPONSE, N::NetworkGateway);
        client.register_notification(&vocab::MAC_RESPONSE, N::NetworkMac);
        client.register_notification(&vocab::SDDP_RESPONSE, N::NetworkSddp);
    }

    pub fn model(&self) -> &NetworkModel {
        &self.network
    }

    /// The full query form, including the immutable MAC.
    fn query_records(&self) -> ProxyResult<Vec<Record>> {
        Ok(vec![
            vocab::dhcp_response(self.network.dhcp_enabled()?),
            vocab::address_response(self.network.address()?),
            vocab::netmask_response(self.network.netmask()?),
            vocab::gateway_response(self.network.gateway()?),
            vocab::mac_response(self.network.mac()?),
            vocab::sddp_response(self.network.sddp_enabled()?),
        ])
    }

    pub fn on_query(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        record: &Record,
        reproxied: bool,
    ) -> ProxyResult<()> {
        match self.query_records() {
            Ok(records) => {
                // The bundle carries no query echo; `SDDP` is last.
                ctx.server.send_records(origin, &records);
                Ok(())
            }
            Err(error) if error.is_not_initialized() && !reproxied => {
                self.basis.proxy_observation(
                    ctx.client,
                    origin,
                    record.clone(),
                    ResponseMatcher::Bundle {
                        parts: NETWORK_QUERY_PARTS,
                        terminator: &vocab::SDDP_RESPONSE,
                    },
                    RequestRoute::NetworkQuery,
                    Some(NotificationRoute::NetworkSddp),
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
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

        let parse_address = |pattern: &'static crate::protocol::Pattern| -> ProxyResult<Ipv4Addr> {
            let captures = pattern
                .matches(body)
                .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
            capture_str(&captures, 1)?
                .parse()
                .map_err(|_| ProxyError::BadCommand(format!("unparsable address `{body}`")))
        };

        let change = match route {
            NotificationRoute::NetworkDhcp => {
                let captures = vocab::DHCP_RESPONSE
                    .matches(body)
                    .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
                self.network.set_dhcp_enabled(capture_flag(&captures, 1)?)
            }
            NotificationRoute::NetworkAddress => {
                let address = parse_address(&vocab::ADDRESS_RESPONSE)?;
                self.network.set_address(address)
            }
            NotificationRoute::NetworkNetmask => {
                let netmask = parse_address(&vocab::NETMASK_RESPONSE)?;
                self.network.set_netmask(netmask)
            }
            NotificationRoute::NetworkGateway => {
                let gateway = parse_address(&vocab::GATEWAY_RESPONSE)?;
                self.network.set_gateway(gateway)
            }
            NotificationRoute::NetworkMac => {
                let captures = vocab::MAC_RESPONSE
                    .matches(body)
                    .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
                let mac = MacAddress::parse(capture_str(&captures, 1)?)?;
                self.network.set_mac(mac)
            }
            NotificationRoute::NetworkSddp => {
                let captures = vocab::SDDP_RESPONSE
                    .matches(body)
                    .ok_or_else(|| ProxyError::BadCommand(format!("unparsable `{body}`")))?;
                self.network.set_sddp_enabled(capture_flag(&captures, 1)?)
            }
            _ => {
                return Err(ProxyError::BadCommand(
                    "route misdirected to network".into(),
                ))
            }
        };

        if change.is_changed() {
            emitter.emit(NetworkEvent::SettingsChanged.into());
        }
        Ok(change)
    }

    /// Queues the single network query.
    pub fn refresh(&self, client: &mut ClientCommandManager) -> usize {
        self.basis.proxy_refresh(
            client,
            RefreshFamily::Network,
            vocab::query_request(),
            ResponseMatcher::Bundle {
                parts: NETWORK_QUERY_PARTS,
                terminator: &vocab::SDDP_RESPONSE,
            },
            Some(NotificationRoute::NetworkSddp),
        );
        1
    }
}

impl ObjectController for NetworkController {
    /// The restricted form: configuration settings only, no `MAC`.
    fn query_current_configuration(&self, buffer: &mut Vec<Record>) -> ProxyResult<()> {
        buffer.push(vocab::dhcp_response(self.network.dhcp_enabled()?));
        buffer.push(vocab::address_response(self.network.address()?));
        buffer.push(vocab::netmask_response(self.network.netmask()?));
        buffer.push(vocab::gateway_response(self.network.gateway()?));
        buffer.push(vocab::sddp_response(self.network.sddp_enabled()?));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventEmitter;
    use tokio::sync::mpsc;
    use tokio::time::Duration;

    fn populated() -> NetworkController {
        let mut network = NetworkController::new(ControllerBasis::new(Duration::from_secs(5)));
        for (route, body) in [
            (NotificationRoute::NetworkDhcp, "DHCP1"),
            (NotificationRoute::NetworkAddress, "IP192.168.1.48"),
            (NotificationRoute::NetworkNetmask, "NM255.255.255.0"),
            (NotificationRoute::NetworkGateway, "GW192.168.1.1"),
            (NotificationRoute::NetworkMac, "MAC00-50-C2-D8-24-71"),
            (NotificationRoute::NetworkSddp, "SDDP0"),
        ] {
            network
                .apply_notification(route, &Record::from(body), &NoopEventEmitter)
                .unwrap();
        }
        network
    }

    #[tokio::test]
    async fn query_reply_includes_mac_and_ends_with_sddp() {
        let mut network = populated();
        let mut client = ClientCommandManager::new();
        let mut server = ServerCommandManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.connection_opened(1, tx);
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        network
            .on_query(&mut ctx, 1, &Record::from("QE"), false)
            .unwrap();
        let bytes = rx.try_recv().unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "(DHCP1)\r\n(IP192.168.1.48)\r\n(NM255.255.255.0)\r\n\
             (GW192.168.1.1)\r\n(MAC00-50-C2-D8-24-71)\r\n(SDDP0)\r\n"
        );
    }

    #[test]
    fn configuration_dump_omits_the_mac() {
        let network = populated();
        let mut buffer = Vec::new();
        network.query_current_configuration(&mut buffer).unwrap();
        let bodies: Vec<_> = buffer
            .iter()
            .map(|record| record.body_str().unwrap().to_string())
            .collect();
        assert_eq!(
            bodies,
            vec![
                "DHCP1",
                "IP192.168.1.48",
                "NM255.255.255.0",
                "GW192.168.1.1",
                "SDDP0"
            ]
        );
    }

    #[tokio::test]
    async fn uninitialized_query_forwards_with_sddp_terminator() {
        let mut network = NetworkController::new(ControllerBasis::new(Duration::from_secs(5)));
        let mut client = ClientCommandManager::new();
        let mut server = ServerCommandManager::new();
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        network
            .on_query(&mut ctx, 1, &Record::from("QE"), false)
            .unwrap();
        assert_eq!(client.pending_exchanges(), 1);
    }
}
