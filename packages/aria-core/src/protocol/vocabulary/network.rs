//! Network command vocabulary.
//!
//! The network query response is a fixed multi-record bundle ending with the
//! `SDDP` record; there is no query echo. The configuration dump reuses the
//! bundle but omits the immutable `MAC` record.

use std::net::Ipv4Addr;

use crate::model::network::MacAddress;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::Pattern;

pub static QUERY_REQUEST: Pattern = Pattern::new("network query", r"^QE$", 1);

pub static DHCP_RESPONSE: Pattern = Pattern::new("network dhcp", r"^DHCP([01])$", 2);
pub static ADDRESS_RESPONSE: Pattern =
    Pattern::new("network address", r"^IP(\d+\.\d+\.\d+\.\d+)$", 2);
pub static NETMASK_RESPONSE: Pattern =
    Pattern::new("network netmask", r"^NM(\d+\.\d+\.\d+\.\d+)$", 2);
pub static GATEWAY_RESPONSE: Pattern =
    Pattern::new("network gateway", r"^GW(\d+\.\d+\.\d+\.\d+)$", 2);
pub static MAC_RESPONSE: Pattern = Pattern::new(
    "network mac",
    r"^MAC([0-9A-Fa-f]{2}(?:-[0-9A-Fa-f]{2}){5})$",
    2,
);
pub static SDDP_RESPONSE: Pattern = Pattern::new("network sddp", r"^SDDP([01])$", 2);

pub fn query_request() -> Record {
    Record::from("QE")
}

pub fn dhcp_response(enabled: bool) -> Record {
    Record::from(format!("DHCP{}", u8::from(enabled)))
}

pub fn address_response(address: Ipv4Addr) -> Record {
    Record::from(format!("IP{address}"))
}

pub fn netmask_response(netmask: Ipv4Addr) -> Record {
    Record::from(format!("NM{netmask}"))
}

pub fn gateway_response(gateway: Ipv4Addr) -> Record {
    Record::from(format!("GW{gateway}"))
}

pub fn mac_response(mac: MacAddress) -> Record {
    Record::from(format!("MAC{mac}"))
}

pub fn sddp_response(enabled: bool) -> Record {
    Record::from(format!("SDDP{}", u8::from(enabled)))
}

#[cfg(test)]
pub(crate) fn all_patterns() -> Vec<&'static Pattern> {
    vec![
        &QUERY_REQUEST,
        &DHCP_RESPONSE,
        &ADDRESS_RESPONSE,
        &NETMASK_RESPONSE,
        &GATEWAY_RESPONSE,
        &MAC_RESPONSE,
        &SDDP_RESPONSE,
    ]
}
