// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Store key layout (§6): a per-switch prefix, with a fixed sub-prefix per
//! resource kind. Static ARP entries are the one exception, keyed
//! `<switch>/<arp-prefix>/<outgoing-if>/<ip>` rather than by name.

/// Sub-prefix for [`model::resource::Interface`] keys.
pub const INTERFACE: &str = "interface";
/// Sub-prefix for [`model::resource::BridgeDomain`] keys.
pub const BRIDGE_DOMAIN: &str = "bridge-domain";
/// Sub-prefix for [`model::resource::StaticRoute`] keys.
pub const ROUTE: &str = "route";
/// Sub-prefix for [`model::resource::ArpEntry`] keys.
pub const ARP: &str = "arp";
/// Sub-prefix for [`model::resource::L2FibEntry`] keys.
pub const L2FIB: &str = "l2fib";
/// Sub-prefix for [`model::resource::CrossConnect`] keys.
pub const XCONNECT: &str = "xconnect";
/// Sub-prefix for [`model::resource::LinuxVeth`] keys.
pub const LINUX_INTERFACE: &str = "linux-interface";

/// `<switch>/interface/<name>`.
#[must_use]
pub fn interface(switch: &str, name: &str) -> String {
    format!("{switch}/{INTERFACE}/{name}")
}

/// `<switch>/bridge-domain/<name>`.
#[must_use]
pub fn bridge_domain(switch: &str, name: &str) -> String {
    format!("{switch}/{BRIDGE_DOMAIN}/{name}")
}

/// `<switch>/route/<description>`.
#[must_use]
pub fn route(switch: &str, description: &str) -> String {
    format!("{switch}/{ROUTE}/{description}")
}

/// `<switch>/arp/<outgoing-if>/<ip>`, the one key that is not
/// `<switch>/<sub-prefix>/<name>` shaped.
#[must_use]
pub fn arp(switch: &str, outgoing_interface: &str, ip: &std::net::Ipv4Addr) -> String {
    format!("{switch}/{ARP}/{outgoing_interface}/{ip}")
}

/// `<switch>/l2fib/<bridge>/<mac>`.
#[must_use]
pub fn l2fib(switch: &str, bridge: &str, mac: &net::eth::mac::Mac) -> String {
    format!("{switch}/{L2FIB}/{bridge}/{mac}")
}

/// `<switch>/xconnect/<rx-if>`.
#[must_use]
pub fn xconnect(switch: &str, rx_if: &str) -> String {
    format!("{switch}/{XCONNECT}/{rx_if}")
}

/// `<switch>/linux-interface/<name>`.
#[must_use]
pub fn linux_interface(switch: &str, name: &str) -> String {
    format!("{switch}/{LINUX_INTERFACE}/{name}")
}
