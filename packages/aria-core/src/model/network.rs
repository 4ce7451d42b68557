//! Network interface state: DHCPv4, IPv4 addressing, Ethernet MAC, SDDP.
//!
//! The MAC is immutable device state; it appears in direct network queries
//! but is omitted from configuration dumps.

use std::fmt;
use std::net::Ipv4Addr;

use crate::error::{ModelError, ModelResult};
use crate::model::{set_slot, Change};

/// An Ethernet MAC address, wire-formatted as `xx-xx-xx-xx-xx-xx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Parses the dashed-hex wire form.
    pub fn parse(raw: &str) -> ModelResult<Self> {
        let mut octets = [0u8; 6];
        let mut count = 0;
        for part in raw.split('-') {
            if count == 6 || part.len() != 2 {
                return Err(ModelError::OutOfRange("mac address"));
            }
            octets[count] = u8::from_str_radix(part, 16)
                .map_err(|_| ModelError::OutOfRange("mac address"))?;
            count += 1;
        }
        if count != 6 {
            return Err(ModelError::OutOfRange("mac address"));
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}-{:02X}-{:02X}-{:02X}-{:02X}-{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// State for the device network interface.
#[derive(Debug, Clone, Default)]
pub struct NetworkModel {
    dhcp_enabled: Option<bool>,
    address: Option<Ipv4Addr>,
    netmask: Option<Ipv4Addr>,
    gateway: Option<Ipv4Addr>,
    mac: Option<MacAddress>,
    sddp_enabled: Option<bool>,
}

impl NetworkModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dhcp_enabled(&self) -> ModelResult<bool> {
        self.dhcp_enabled
            .ok_or(ModelError::NotInitialized("network dhcp"))
    }

    pub fn address(&self) -> ModelResult<Ipv4Addr> {
        self.address
            .ok_or(ModelError::NotInitialized("network address"))
    }

    pub fn netmask(&self) -> ModelResult<Ipv4Addr> {
        self.netmask
            .ok_or(ModelError::NotInitialized("network netmask"))
    }

    pub fn gateway(&self) -> ModelResult<Ipv4Addr> {
        self.gateway
            .ok_or(ModelError::NotInitialized("network gateway"))
    }

    pub fn mac(&self) -> ModelResult<MacAddress> {
        self.mac.ok_or(ModelError::NotInitialized("network mac"))
    }

    pub fn sddp_enabled(&self) -> ModelResult<bool> {
        self.sddp_enabled
            .ok_or(ModelError::NotInitialized("network sddp"))
    }

    pub fn is_initialized(&self) -> bool {
        self.dhcp_enabled.is_some()
            && self.address.is_some()
            && self.netmask.is_some()
            && self.gateway.is_some()
            && self.mac.is_some()
            && self.sddp_enabled.is_some()
    }

    pub fn set_dhcp_enabled(&mut self, enabled: bool) -> Change {
        set_slot(&mut self.dhcp_enabled, enabled)
    }

    pub fn set_address(&mut self, address: Ipv4Addr) -> Change {
        set_slot(&mut self.address, address)
    }

    pub fn set_netmask(&mut self, netmask: Ipv4Addr) -> Change {
        set_slot(&mut self.netmask, netmask)
    }

    pub fn set_gateway(&mut self, gateway: Ipv4Addr) -> Change {
        set_slot(&mut self.gateway, gateway)
    }

    pub fn set_mac(&mut self, mac: MacAddress) -> Change {
        set_slot(&mut self.mac, mac)
    }

    pub fn set_sddp_enabled(&mut self, enabled: bool) -> Change {
        set_slot(&mut self.sddp_enabled, enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_round_trips_the_wire_form() {
        let mac = MacAddress::parse("00-50-C2-D8-24-71").unwrap();
        assert_eq!(mac.to_string(), "00-50-C2-D8-24-71");
    }

    #[test]
    fn mac_rejects_malformed_input() {
        assert!(MacAddress::parse("00-50-C2-D8-24").is_err());
        assert!(MacAddress::parse("00-50-C2-D8-24-71-00").is_err());
        assert!(MacAddress::parse("00-50-C2-D8-24-GG").is_err());
        assert!(MacAddress::parse("0050C2D82471").is_err());
    }

    #[test]
    fn initialized_requires_all_fields() {
        let mut network = NetworkModel::new();
        network.set_dhcp_enabled(true);
        network.set_address(Ipv4Addr::new(192, 168, 1, 48));
        network.set_netmask(Ipv4Addr::new(255, 255, 255, 0));
        network.set_gateway(Ipv4Addr::new(192, 168, 1, 1));
        network.set_sddp_enabled(false);
        assert!(!network.is_initialized());
        network.set_mac(MacAddress::parse("00-50-C2-D8-24-71").unwrap());
        assert!(network.is_initialized());
    }
}
