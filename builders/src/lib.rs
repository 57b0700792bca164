// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Resource builders (§4.C): pure constructors for the seven resource kinds,
//! taking normalized parameters and returning the fully populated record.
//!
//! These never allocate through `id` or `ipam` and never touch the store;
//! they enforce only the trivial invariants §3 assigns to each resource kind
//! (stripping a `/prefix` suffix off an address string, merging an explicit
//! MTU with the system default, translating the controller's rx-mode enum
//! into the dataplane's).

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]

use std::net::{Ipv4Addr, Ipv6Addr};

use model::errors::BuilderError;
use model::input::{BridgeDomainDefaults, RxMode};
use model::resource::{
    ArpEntry, BridgeDomain, CrossConnect, Interface, InterfaceKind, L2FibEntry, LinuxVeth, StaticRoute,
    strip_slash,
};
use net::eth::mac::Mac;

/// Translate the controller's rx-mode to the dataplane's. `Unknown` resolves
/// to `Interrupt`, the dataplane's own default when nothing was requested.
#[must_use]
pub fn translate_rx_mode(mode: RxMode) -> RxMode {
    match mode {
        RxMode::Unknown => RxMode::Interrupt,
        other => other,
    }
}

/// Resolve an explicit MTU override against the system default.
#[must_use]
pub fn resolve_mtu(explicit: Option<u16>, default: u16) -> u16 {
    explicit.unwrap_or(default)
}

/// Parse a `/prefix`-suffixed or bare address string into an [`Ipv4Addr`].
fn parse_stripped(addr: &str) -> Result<Ipv4Addr, BuilderError> {
    strip_slash(addr)
        .parse()
        .map_err(|_| BuilderError::InvariantViolation(format!("invalid IPv4 address: '{addr}'")))
}

/// Normalized parameters for [`build_interface`]; covers the ethernet,
/// loopback, memif and af-packet kinds. VXLAN tunnels go through
/// [`build_vxlan_tunnel`], which has its own address-stripping invariant.
#[derive(Debug, Clone)]
pub struct InterfaceParams {
    pub name: String,
    pub kind: InterfaceKind,
    pub phy_address: Option<Mac>,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub mtu: Option<u16>,
    pub rx_mode: RxMode,
}

/// Build an interface record, merging `params.mtu` with `default_mtu` and
/// translating `params.rx_mode` to the dataplane's enum.
#[must_use]
pub fn build_interface(params: InterfaceParams, default_mtu: u16) -> Interface {
    Interface {
        name: params.name,
        kind: params.kind,
        enabled: true,
        phy_address: params.phy_address,
        ipv4: params.ipv4,
        ipv6: params.ipv6,
        mtu: resolve_mtu(params.mtu, default_mtu),
        rx_mode: translate_rx_mode(params.rx_mode),
    }
}

/// Build a VXLAN-tunnel interface. `src`/`dst` are stripped of any
/// `/prefix` suffix before being parsed, per §3's Interface invariant.
pub fn build_vxlan_tunnel(
    name: impl Into<String>,
    src: &str,
    dst: &str,
    vni: u32,
    default_mtu: u16,
) -> Result<Interface, BuilderError> {
    let src = parse_stripped(src)?;
    let dst = parse_stripped(dst)?;
    Ok(Interface {
        name: name.into(),
        kind: InterfaceKind::VxlanTunnel { src, dst, vni },
        enabled: true,
        phy_address: None,
        ipv4: Vec::new(),
        ipv6: Vec::new(),
        mtu: default_mtu,
        rx_mode: RxMode::Unknown,
    })
}

/// Build an empty bridge domain with `defaults`' flags. Members are added
/// afterward via [`model::resource::BridgeDomain::add_member`].
#[must_use]
pub fn build_bridge_domain(name: impl Into<String>, defaults: BridgeDomainDefaults) -> BridgeDomain {
    BridgeDomain::new(name, defaults)
}

/// Build a static route record. `next_hop` is stripped of any `/prefix`
/// suffix before being parsed, per §3's Static route invariant.
pub fn build_static_route(
    vrf_id: u32,
    description: impl Into<String>,
    dst_ip: Ipv4Addr,
    dst_prefix_len: u8,
    next_hop: &str,
    outgoing_interface: impl Into<String>,
    weight: u8,
    preference: u8,
) -> Result<StaticRoute, BuilderError> {
    let next_hop = parse_stripped(next_hop)?;
    Ok(StaticRoute {
        vrf_id,
        description: description.into(),
        dst_ip,
        dst_prefix_len,
        next_hop,
        outgoing_interface: outgoing_interface.into(),
        weight,
        preference,
    })
}

/// Build a static ARP entry. Always `is_static = true` (§3).
#[must_use]
pub fn build_arp_entry(interface: impl Into<String>, ip: Ipv4Addr, mac: Mac) -> ArpEntry {
    ArpEntry {
        interface: interface.into(),
        ip,
        mac,
        is_static: true,
    }
}

/// Build an L2-FIB entry. Always `is_static = true` (§3, action=FORWARD is
/// implicit for every entry this controller installs).
#[must_use]
pub fn build_l2fib_entry(
    bridge: impl Into<String>,
    mac: Mac,
    outgoing_interface: impl Into<String>,
) -> L2FibEntry {
    L2FibEntry {
        bridge: bridge.into(),
        mac,
        outgoing_interface: outgoing_interface.into(),
        is_static: true,
    }
}

/// Build the symmetric `(rx, tx)` / `(tx, rx)` cross-connect pair (§3).
#[must_use]
pub fn build_cross_connect_pair(a: impl Into<String>, b: impl Into<String>) -> [CrossConnect; 2] {
    CrossConnect::symmetric_pair(a, b)
}

/// Parameters for [`build_linux_veth`].
#[derive(Debug, Clone)]
pub struct LinuxVethParams {
    pub name: String,
    pub peer_name: String,
    pub host_if_name: String,
    pub container_namespace: String,
    pub mac: Option<Mac>,
    pub ipv4: Vec<Ipv4Addr>,
    pub ipv6: Vec<Ipv6Addr>,
    pub mtu: Option<u16>,
}

/// Build a Linux veth-pair record, merging `params.mtu` with `default_mtu`.
#[must_use]
pub fn build_linux_veth(params: LinuxVethParams, default_mtu: u16) -> LinuxVeth {
    LinuxVeth {
        name: params.name,
        peer_name: params.peer_name,
        host_if_name: params.host_if_name,
        container_namespace: params.container_namespace,
        mac: params.mac,
        ipv4: params.ipv4,
        ipv6: params.ipv6,
        mtu: resolve_mtu(params.mtu, default_mtu),
    }
}
