// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Declarative input entities (§3, §6): `SystemParameters`, `HostEntity` and
//! `ExternalEntity`. `SfcEntity`/`SfcElement` live in [`crate::sfc`].

use std::net::{Ipv4Addr, Ipv6Addr};

use derive_builder::Builder;
use net::eth::mac::Mac;
use serde::{Deserialize, Serialize};

/// The dataplane's receive-mode enum, translated from the controller's by the
/// resource builders (§4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RxMode {
    #[default]
    Unknown,
    Polling,
    Interrupt,
}

/// Bridge-domain flag defaults (§6), one instance each for the dynamic and
/// static default east-west bridges `WireHost` creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeDomainDefaults {
    pub flood: bool,
    pub uu_flood: bool,
    pub forward: bool,
    pub learn: bool,
    pub arp_term: bool,
    pub mac_age: u32,
}

impl BridgeDomainDefaults {
    /// Defaults for `WireHost`'s dynamic east-west bridge (`SFC_EW_BD`).
    #[must_use]
    pub const fn dynamic() -> Self {
        BridgeDomainDefaults {
            flood: true,
            uu_flood: true,
            forward: true,
            learn: true,
            arp_term: false,
            mac_age: 0,
        }
    }

    /// Defaults for `WireHost`'s static, L2-FIB-driven bridge (`SFC_EW_BD_L2FIB`).
    #[must_use]
    pub const fn static_l2fib() -> Self {
        BridgeDomainDefaults {
            flood: false,
            uu_flood: false,
            forward: true,
            learn: false,
            arp_term: false,
            mac_age: 0,
        }
    }
}

/// System-wide defaults (§3, §6), cached by the wiring engine's
/// `SetSystemParameters` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemParameters {
    pub mtu: u16,
    pub starting_vlan_id: u32,
    pub default_route_weight: u8,
    pub default_route_preference: u8,
    pub dynamic_bridge: BridgeDomainDefaults,
    pub static_bridge: BridgeDomainDefaults,
}

impl Default for SystemParameters {
    fn default() -> Self {
        SystemParameters {
            mtu: 1500,
            starting_vlan_id: 5000,
            default_route_weight: 5,
            default_route_preference: 0,
            dynamic_bridge: BridgeDomainDefaults::dynamic(),
            static_bridge: BridgeDomainDefaults::static_l2fib(),
        }
    }
}

/// A programmable switch standing in for one physical or virtual host (§3).
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into, strip_option), default)]
pub struct HostEntity {
    pub name: String,
    pub eth_if_name: Option<String>,
    pub eth_ipv4: Option<Ipv4Addr>,
    pub eth_ipv6: Option<Ipv6Addr>,
    pub loopback_mac: Option<Mac>,
    pub loopback_ipv4: Option<Ipv4Addr>,
    pub loopback_ipv6: Option<Ipv6Addr>,
    pub vxlan_tunnel_ipv4: Option<Ipv4Addr>,
    pub create_vxlan_static_route: bool,
    pub mtu: Option<u16>,
    pub rx_mode: RxMode,
}

impl Default for HostEntity {
    fn default() -> Self {
        HostEntity {
            name: String::new(),
            eth_if_name: None,
            eth_ipv4: None,
            eth_ipv6: None,
            loopback_mac: None,
            loopback_ipv4: None,
            loopback_ipv6: None,
            vxlan_tunnel_ipv4: None,
            create_vxlan_static_route: false,
            mtu: None,
            rx_mode: RxMode::Unknown,
        }
    }
}

/// The host-side half of an external router's attachment (§3).
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into, strip_option), default)]
pub struct HostInterface {
    pub if_name: Option<String>,
    pub ipv4: Option<Ipv4Addr>,
}

impl Default for HostInterface {
    fn default() -> Self {
        HostInterface {
            if_name: None,
            ipv4: None,
        }
    }
}

/// The host-side VXLAN source endpoint used to reach an external entity (§3).
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into, strip_option), default)]
pub struct HostVxlan {
    pub if_name: Option<String>,
    pub source_ipv4: Option<Ipv4Addr>,
}

impl Default for HostVxlan {
    fn default() -> Self {
        HostVxlan {
            if_name: None,
            source_ipv4: None,
        }
    }
}

/// Optional bridge-domain hint an external entity may carry (§3, §6 `host_bd`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostBridgeDomainHint {
    pub id: Option<String>,
    pub bdi_ipv4: Option<Ipv4Addr>,
    pub interfaces: Vec<String>,
}

/// A physical router the controller hands off VXLAN bridges to, via the
/// external-entity driver contract (§6).
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into, strip_option), default)]
pub struct ExternalEntity {
    pub name: String,
    pub mgmt_ip: Option<Ipv4Addr>,
    pub mgmt_port: Option<u16>,
    pub mgmt_user: Option<String>,
    pub mgmt_pwd: Option<String>,
    pub driver_type: String,
    pub host_interface: HostInterface,
    pub host_vxlan: HostVxlan,
    pub host_bd: Option<HostBridgeDomainHint>,
}

impl Default for ExternalEntity {
    fn default() -> Self {
        ExternalEntity {
            name: String::new(),
            mgmt_ip: None,
            mgmt_port: None,
            mgmt_user: None,
            mgmt_pwd: None,
            driver_type: String::new(),
            host_interface: HostInterface::default(),
            host_vxlan: HostVxlan::default(),
            host_bd: None,
        }
    }
}
