// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Persisted ID binding namespaces (§3, §4.A): the shared `HEIDs`/MAC-instance
//! table, the shared `HE2EEIDs`/`HE2HEIDs` VLAN/VNI table, and `SFCIDs`. Each
//! wraps an [`id::Allocator`] scoped to the counter family it draws from,
//! keyed the way §3 describes.

use std::collections::BTreeMap;

use id::{MacInstance, MacInstanceId, MemifId, Vlan, VlanId, VethId};
use serde::{Deserialize, Serialize};

/// Key into the shared MAC-instance counter: which binding kind an id
/// belongs to.
///
/// `HEIDs[he]` (a host's loopback MAC) and `SFCIDs[..].mac_addr_id` (a
/// container port's MAC) draw from the *same* counter — two different
/// bindings must never format to the same `02:00:xx:xx:xx:xx` address
/// (§3 invariant 2).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
enum MacInstanceKey {
    HostLoopback(String),
    SfcPort(SfcIdKey),
}

/// `HEIDs[he] -> loopback-MAC-instance-id`, and the MAC-instance half of
/// `SFCIDs[sfc, container, port]`, both views onto one shared
/// [`id::Allocator`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MacInstanceBindings {
    inner: id::Allocator<MacInstance, MacInstanceKey>,
}

impl MacInstanceBindings {
    /// An empty binding table, counter starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `HEIDs[he]`: return the existing loopback MAC-instance id, or
    /// allocate a new one.
    pub fn allocate_host_loopback(
        &mut self,
        he: impl Into<String>,
    ) -> Result<MacInstanceId, id::AllocationError> {
        self.inner.allocate(MacInstanceKey::HostLoopback(he.into()))
    }

    /// `SFCIDs[key].mac_addr_id`: return the existing port MAC-instance id,
    /// or allocate a new one.
    pub fn allocate_sfc_port(
        &mut self,
        key: SfcIdKey,
    ) -> Result<MacInstanceId, id::AllocationError> {
        self.inner.allocate(MacInstanceKey::SfcPort(key))
    }

    /// Look up `he`'s loopback MAC-instance id, without allocating one.
    #[must_use]
    pub fn get_host_loopback(&self, he: &str) -> Option<MacInstanceId> {
        self.inner.get(&MacInstanceKey::HostLoopback(he.to_string()))
    }

    /// Look up `key`'s port MAC-instance id, without allocating one.
    #[must_use]
    pub fn get_sfc_port(&self, key: &SfcIdKey) -> Option<MacInstanceId> {
        self.inner.get(&MacInstanceKey::SfcPort(key.clone()))
    }
}

/// Key into the shared VLAN/VNI counter: which edge kind an id is bound to.
///
/// `HE2EEIDs` and `HE2HEIDs` draw from the *same* monotonic counter, not two
/// independent ones — a VNI handed out for a host/external-entity edge must
/// never collide with one handed out for a host/host edge (§3 invariant 2).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
enum VlanKey {
    He2Ee(String, String),
    He2He(String, String),
}

/// `HE2EEIDs[he, ee]` and `HE2HEIDs[src-he, dst-he]`, both views onto one
/// shared VLAN/VNI [`id::Allocator`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VlanBindings {
    inner: id::Allocator<Vlan, VlanKey>,
}

impl VlanBindings {
    /// An empty binding table, counter starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the shared counter to `value` if no binding has been made yet
    /// (`SetSystemParameters`, applied exactly once).
    pub fn seed_if_unused(&mut self, value: u32) {
        self.inner.seed_if_unused(value);
    }

    /// `HE2EEIDs[he, ee]`: return the existing VNI or allocate a new one.
    pub fn allocate_he_to_ee(
        &mut self,
        he: impl Into<String>,
        ee: impl Into<String>,
    ) -> Result<VlanId, id::AllocationError> {
        self.inner.allocate(VlanKey::He2Ee(he.into(), ee.into()))
    }

    /// `HE2HEIDs[src-he, dst-he]`: return the existing VNI or allocate a new one.
    pub fn allocate_he_to_he(
        &mut self,
        src: impl Into<String>,
        dst: impl Into<String>,
    ) -> Result<VlanId, id::AllocationError> {
        self.inner.allocate(VlanKey::He2He(src.into(), dst.into()))
    }

    /// Look up the VNI bound to `(he, ee)`, without allocating one.
    #[must_use]
    pub fn get_he_to_ee(&self, he: &str, ee: &str) -> Option<VlanId> {
        self.inner
            .get(&VlanKey::He2Ee(he.to_string(), ee.to_string()))
    }

    /// Look up the VNI bound to `(src, dst)`, without allocating one.
    #[must_use]
    pub fn get_he_to_he(&self, src: &str, dst: &str) -> Option<VlanId> {
        self.inner
            .get(&VlanKey::He2He(src.to_string(), dst.to_string()))
    }
}

/// Key into [`SFCIDs`]: `(sfc, container, port)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SfcIdKey {
    pub sfc: String,
    pub container: String,
    pub port: String,
}

impl SfcIdKey {
    #[must_use]
    pub fn new(sfc: impl Into<String>, container: impl Into<String>, port: impl Into<String>) -> Self {
        SfcIdKey {
            sfc: sfc.into(),
            container: container.into(),
            port: port.into(),
        }
    }
}

/// `SFCIDs[sfc, container, port] -> (ip-id, mac-addr-id, memif-id, veth-id)`.
///
/// Each of the four ids is allocated independently and lazily (§4.E "Auto
/// IP/MAC"): a chain that never needs a veth, for instance, simply never
/// populates `veth_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SfcBinding {
    pub ip_id: Option<u32>,
    pub mac_addr_id: Option<MacInstanceId>,
    pub memif_id: Option<MemifId>,
    pub veth_id: Option<VethId>,
}

/// The `SFCIDs` namespace: one [`SfcBinding`] per `(sfc, container, port)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SFCIDs {
    bindings: BTreeMap<SfcIdKey, SfcBinding>,
}

impl SFCIDs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (creating an empty one if absent) the binding for `key`.
    pub fn entry(&mut self, key: SfcIdKey) -> &mut SfcBinding {
        self.bindings.entry(key).or_default()
    }

    #[must_use]
    pub fn get(&self, key: &SfcIdKey) -> Option<&SfcBinding> {
        self.bindings.get(key)
    }

    #[must_use]
    pub fn bindings(&self) -> &BTreeMap<SfcIdKey, SfcBinding> {
        &self.bindings
    }
}
