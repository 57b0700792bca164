// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Scoped, restorable id allocation.
//!
//! The allocators in [`alloc`] hand out small dense integers (VLAN tags,
//! memif ids, veth ids, MAC instance numbers) keyed by an arbitrary key type,
//! and can be reseeded from persisted state so a restarted controller keeps
//! handing out the same id for the same key.

pub mod alloc;
pub use alloc::{
    AllocationError, Allocator, MacInstance, MacInstanceId, Memif, MemifId, ScopedId, Veth,
    VethId, Vlan, VlanId, format_mac_instance, mac_instance_id,
};
