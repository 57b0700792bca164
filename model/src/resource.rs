// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Derived resource entities (§3): the seven resource kinds the wiring
//! engine builds and the store gateway writes, one record per per-switch key.

use std::net::{Ipv4Addr, Ipv6Addr};

use net::eth::mac::Mac;
use serde::{Deserialize, Serialize};

use crate::input::RxMode;

/// Strip a trailing `/prefix` suffix from an address string (§3 Interface
/// invariant, §8 round-trip law `stripSlash(addr + "/" + prefix) = addr`).
#[must_use]
pub fn strip_slash(addr_with_prefix: &str) -> &str {
    match addr_with_prefix.split_once('/') {
        Some((addr, _)) => addr,
        None => addr_with_prefix,
    }
}

/// Kind-specific payload distinguishing the five interface kinds (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InterfaceKind {
    Ethernet,
    Loopback,
    VxlanTunnel { src: Ipv4Addr, dst: Ipv4Addr, vni: u32 },
    Memif { memif_id: u32, is_master: bool },
    AfPacket { host_if: String },
}

/// A switch-local interface record (§3 `Interface`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    pub kind: InterfaceKind,
    pub enabled: bool,
    pub phy_address: Option<Mac>,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub mtu: u16,
    pub rx_mode: RxMode,
}

/// A bridge domain record (§3 `Bridge-domain`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeDomain {
    pub name: String,
    pub flood: bool,
    pub uu_flood: bool,
    pub forward: bool,
    pub learn: bool,
    pub arp_term: bool,
    pub mac_age: u32,
    members: Vec<String>,
}

impl BridgeDomain {
    #[must_use]
    pub fn new(name: impl Into<String>, defaults: crate::input::BridgeDomainDefaults) -> Self {
        BridgeDomain {
            name: name.into(),
            flood: defaults.flood,
            uu_flood: defaults.uu_flood,
            forward: defaults.forward,
            learn: defaults.learn,
            arp_term: defaults.arp_term,
            mac_age: defaults.mac_age,
            members: Vec::new(),
        }
    }

    /// Add `member` to this bridge's member set, if not already present, and
    /// keep the set sorted for stable serialization (§3: "order not
    /// semantically significant but sorted for stable serialization").
    pub fn add_member(&mut self, member: impl Into<String>) {
        let member = member.into();
        if let Err(idx) = self.members.binary_search(&member) {
            self.members.insert(idx, member);
        }
    }

    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

/// A static route record (§3 `Static route`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticRoute {
    pub vrf_id: u32,
    pub description: String,
    pub dst_ip: Ipv4Addr,
    pub dst_prefix_len: u8,
    pub next_hop: Ipv4Addr,
    pub outgoing_interface: String,
    pub weight: u8,
    pub preference: u8,
}

/// A static ARP entry record (§3 `Static ARP entry`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArpEntry {
    pub interface: String,
    pub ip: Ipv4Addr,
    pub mac: Mac,
    pub is_static: bool,
}

/// An L2-FIB entry record (§3 `L2-FIB entry`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2FibEntry {
    pub bridge: String,
    pub mac: Mac,
    pub outgoing_interface: String,
    pub is_static: bool,
}

/// A unidirectional cross-connect entry; always installed as a symmetric
/// `(rx, tx)` / `(tx, rx)` pair (§3 `Cross-connect`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossConnect {
    pub rx_if: String,
    pub tx_if: String,
}

impl CrossConnect {
    /// Build the symmetric pair of cross-connects between `a` and `b`.
    #[must_use]
    pub fn symmetric_pair(a: impl Into<String>, b: impl Into<String>) -> [CrossConnect; 2] {
        let a = a.into();
        let b = b.into();
        [
            CrossConnect {
                rx_if: a.clone(),
                tx_if: b.clone(),
            },
            CrossConnect { rx_if: b, tx_if: a },
        ]
    }
}

/// A Linux veth-pair record (§3 `Linux-veth`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinuxVeth {
    pub name: String,
    pub peer_name: String,
    pub host_if_name: String,
    pub container_namespace: String,
    pub mac: Option<Mac>,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub mtu: u16,
}

/// The union of all derived resource kinds, as stored under a single
/// per-switch key (§3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resource {
    Interface(Interface),
    BridgeDomain(BridgeDomain),
    StaticRoute(StaticRoute),
    ArpEntry(ArpEntry),
    L2FibEntry(L2FibEntry),
    CrossConnect(CrossConnect),
    LinuxVeth(LinuxVeth),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strip_slash_round_trips() {
        assert_eq!(strip_slash("10.0.0.1/24"), "10.0.0.1");
        assert_eq!(strip_slash("10.0.0.1"), "10.0.0.1");
    }

    #[test]
    fn bridge_domain_member_set_is_sorted_and_deduplicated() {
        let mut bd = BridgeDomain::new("bd0", crate::input::BridgeDomainDefaults::dynamic());
        bd.add_member("vxlan1");
        bd.add_member("memif0");
        bd.add_member("vxlan1");
        assert_eq!(bd.members(), &["memif0".to_string(), "vxlan1".to_string()]);
    }

    #[test]
    fn cross_connect_pair_is_symmetric() {
        let [ab, ba] = CrossConnect::symmetric_pair("a", "b");
        assert_eq!(ab.rx_if, "a");
        assert_eq!(ab.tx_if, "b");
        assert_eq!(ba.rx_if, "b");
        assert_eq!(ba.tx_if, "a");
    }
}
