// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! State cache (§4.D): in-memory derived state the wiring engine consults to
//! decide whether a sub-resource already exists this run.
//!
//! Every edge entry is a record of nullable fields, not a shared pointer:
//! each field transitions `absent -> present` at most once per run and is
//! never cleared by the cache itself (removal belongs to the reconciler's
//! diff path, not to cache writes).

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use net::eth::mac::Mac;

/// The two default east-west bridges `WireHost` creates for a host, named
/// once and never recreated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBridges {
    pub dynamic_bridge: String,
    pub static_bridge: String,
}

/// The lazily-filled sub-resources of one directed host/external-entity edge
/// (`HEToEEs`, `HEToHEs`): a VXLAN interface, the bridge domain it anchors,
/// and an optional static route toward the partner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeState {
    pub vxlan_if: Option<String>,
    pub bridge: Option<String>,
    pub route: Option<String>,
}

/// An element's assigned IPv4 address and MAC, keyed by `(container, port)`
/// (`SFCIFAddr`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SfcAddress {
    pub ipv4: Option<Ipv4Addr>,
    pub mac: Option<Mac>,
}

/// The engine's in-memory derived state for one reconcile cycle.
#[derive(Debug, Default)]
pub struct Cache {
    he: BTreeMap<String, HostBridges>,
    he_to_ee: BTreeMap<(String, String), EdgeState>,
    he_to_he: BTreeMap<(String, String), EdgeState>,
    sfc_to_he: BTreeMap<(String, String), String>,
    sfc_if_addr: BTreeMap<(String, String), SfcAddress>,
}

impl Cache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `he`'s default bridges, created once by `WireHost`.
    pub fn register_host(&mut self, he: impl Into<String>, bridges: HostBridges) {
        self.he.insert(he.into(), bridges);
    }

    /// The default bridges for `he`, if `WireHost` has run for it.
    #[must_use]
    pub fn host(&self, he: &str) -> Option<&HostBridges> {
        self.he.get(he)
    }

    /// Get (creating an empty one if absent) the edge state for `(he, ee)`.
    pub fn he_to_ee_mut(&mut self, he: &str, ee: &str) -> &mut EdgeState {
        self.he_to_ee
            .entry((he.to_string(), ee.to_string()))
            .or_default()
    }

    /// The edge state for `(he, ee)`, without creating one.
    #[must_use]
    pub fn he_to_ee(&self, he: &str, ee: &str) -> Option<&EdgeState> {
        self.he_to_ee.get(&(he.to_string(), ee.to_string()))
    }

    /// Get (creating an empty one if absent) the edge state for `(src, dst)`.
    pub fn he_to_he_mut(&mut self, src: &str, dst: &str) -> &mut EdgeState {
        self.he_to_he
            .entry((src.to_string(), dst.to_string()))
            .or_default()
    }

    /// The edge state for `(src, dst)`, without creating one.
    #[must_use]
    pub fn he_to_he(&self, src: &str, dst: &str) -> Option<&EdgeState> {
        self.he_to_he.get(&(src.to_string(), dst.to_string()))
    }

    /// The per-SFC override bridge name memoized for `(sfc, he)`, if one has
    /// been created (`SFCToHEs`).
    #[must_use]
    pub fn sfc_bridge(&self, sfc: &str, he: &str) -> Option<&str> {
        self.sfc_to_he
            .get(&(sfc.to_string(), he.to_string()))
            .map(String::as_str)
    }

    /// Memoize the per-SFC override bridge name for `(sfc, he)`. Called at
    /// most once per pair; a second call with a different name would
    /// indicate a wiring bug, not a legitimate update, so this overwrites
    /// rather than merges.
    pub fn set_sfc_bridge(&mut self, sfc: &str, he: &str, bridge: impl Into<String>) {
        self.sfc_to_he
            .insert((sfc.to_string(), he.to_string()), bridge.into());
    }

    /// Get (creating a default one if absent) the assigned address for
    /// `(container, port)`.
    pub fn sfc_addr_mut(&mut self, container: &str, port: &str) -> &mut SfcAddress {
        self.sfc_if_addr
            .entry((container.to_string(), port.to_string()))
            .or_default()
    }

    /// The assigned address for `(container, port)`, without creating one.
    #[must_use]
    pub fn sfc_addr(&self, container: &str, port: &str) -> Option<&SfcAddress> {
        self.sfc_if_addr
            .get(&(container.to_string(), port.to_string()))
    }
}
