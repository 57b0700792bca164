// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `SfcEntity` / `SfcElement` (§3, §6): the chain description that drives the
//! wiring engine's `WireSfc` dispatch.

use std::net::{Ipv4Addr, Ipv6Addr};

use derive_builder::Builder;
use lpm::prefix::Prefix;
use net::eth::mac::Mac;
use serde::{Deserialize, Serialize};

use crate::input::RxMode;

/// The ten SFC chain kinds (§1, §4.E), collapsing to three wiring algorithms:
/// north-south VXLAN, north-south NIC, and east-west.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SfcType {
    /// North-south, tunneled over VXLAN to an external entity and/or another host.
    NsVxlan,
    /// North-south, NIC-attached, joined into a bridge domain.
    NsNicBd,
    /// North-south, NIC-attached, L2 cross-connected.
    NsNicL2Xconn,
    /// North-south, NIC-attached, routed (VRF/L3).
    NsNicVrf,
    /// East-west, direct inter-container memif pairing.
    EwMemif,
    /// East-west, joined into the host's default dynamic bridge.
    #[default]
    EwBd,
    /// East-west, joined into the host's default static/L2-FIB bridge.
    EwBdL2Fib,
    /// East-west, L2 cross-connected in declaration order.
    EwL2Xconn,
    /// East-west, NIC-attached VRF variant (spec-reserved, behaves as `EwBd`
    /// with routes installed; kept distinct for dispatch clarity).
    EwVrf,
    /// East-west, af-packet/veth pairing variant of `EwMemif`.
    EwVeth,
}

/// What kind of endpoint an `SfcElement` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    ExternalEntity,
    HostEntity,
    VppContainerMemif,
    NonVppContainerMemif,
    VppContainerAfPacket,
    NonVppContainerAfPacket,
}

impl ElementKind {
    /// Elements attached via shared-memory memif, as opposed to veth/af-packet.
    #[must_use]
    pub const fn is_memif(self) -> bool {
        matches!(
            self,
            ElementKind::VppContainerMemif | ElementKind::NonVppContainerMemif
        )
    }

    /// Elements that are containers (i.e. neither an external entity nor a host).
    #[must_use]
    pub const fn is_container(self) -> bool {
        !matches!(
            self,
            ElementKind::ExternalEntity | ElementKind::HostEntity
        )
    }
}

/// A static L3 route declared directly on an `SfcElement` (§3, used by
/// `SFC_NS_NIC_VRF`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRoute {
    pub dst: Prefix,
    pub next_hop: Ipv4Addr,
}

/// A static ARP entry declared directly on an `SfcElement`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ElementArpEntry {
    pub ip: Ipv4Addr,
    pub mac: Mac,
}

/// One hop of a chain (§3, §6).
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into, strip_option), default)]
pub struct SfcElement {
    pub container: String,
    pub port_label: String,
    pub etcd_vpp_switch_key: String,
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
    pub mac: Option<Mac>,
    pub kind: Option<ElementKind>,
    pub vlan_id: Option<u32>,
    pub mtu: Option<u16>,
    pub rx_mode: RxMode,
    pub l2fib_macs: Vec<Mac>,
    pub l3vrf_routes: Vec<ElementRoute>,
    pub l3arp_entries: Vec<ElementArpEntry>,
}

impl Default for SfcElement {
    fn default() -> Self {
        SfcElement {
            container: String::new(),
            port_label: String::new(),
            etcd_vpp_switch_key: String::new(),
            ipv4: None,
            ipv6: None,
            mac: None,
            kind: None,
            vlan_id: None,
            mtu: None,
            rx_mode: RxMode::Unknown,
            l2fib_macs: Vec::new(),
            l3vrf_routes: Vec::new(),
            l3arp_entries: Vec::new(),
        }
    }
}

/// A declared chain (§3, §6).
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into, strip_option), default)]
pub struct SfcEntity {
    pub name: String,
    pub sfc_type: SfcType,
    pub sfc_ipv4_prefix: Option<Prefix>,
    pub vnf_repeat_count: u32,
    pub bd_parms: Option<BridgeParameters>,
    pub elements: Vec<SfcElement>,
}

impl Default for SfcEntity {
    fn default() -> Self {
        SfcEntity {
            name: String::new(),
            sfc_type: SfcType::EwBd,
            sfc_ipv4_prefix: None,
            vnf_repeat_count: 0,
            bd_parms: None,
            elements: Vec::new(),
        }
    }
}

/// Per-SFC bridge-domain flag override (§4.E `SFC_EW_BD_L2FIB` per-SFC bridges).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeParameters {
    pub flood: bool,
    pub uu_flood: bool,
    pub forward: bool,
    pub learn: bool,
    pub arp_term: bool,
    pub mac_age: u32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn element_kind_classifies_memif_vs_container() {
        assert!(ElementKind::VppContainerMemif.is_memif());
        assert!(!ElementKind::VppContainerAfPacket.is_memif());
        assert!(!ElementKind::HostEntity.is_container());
        assert!(!ElementKind::ExternalEntity.is_container());
        assert!(ElementKind::NonVppContainerAfPacket.is_container());
    }

    #[test]
    fn sfc_element_builder_defaults_are_empty() {
        let el = SfcElementBuilder::default()
            .container("c1")
            .port_label("p1")
            .etcd_vpp_switch_key("vswitch1")
            .build()
            .expect("builder invariants hold");
        assert!(el.ipv4.is_none());
        assert!(el.l2fib_macs.is_empty());
    }
}
