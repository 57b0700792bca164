// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Monotonic, restart-stable counters for VLAN/VNI, memif, MAC-instance and veth
//! identifiers, plus the persisted key-to-id bindings that back them.
//!
//! Each scope is a zero-sized marker type so an id allocated for one scope can
//! never be handed, by accident, to code expecting an id from another scope.

use core::fmt::{self, Debug, Display, Formatter};
use core::marker::PhantomData;
use std::collections::BTreeMap;

use net::eth::mac::Mac;

/// A counter scope, namespacing a family of monotonically-allocated ids.
pub trait Scope: 'static {
    /// Name of the scope, used as the store's binding-table prefix.
    const NAME: &'static str;
}

/// VLAN/VNI id scope. Seeded once from `SystemParameters.starting_vlan_id - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vlan;
impl Scope for Vlan {
    const NAME: &'static str = "vlan";
}

/// memif id scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memif;
impl Scope for Memif {
    const NAME: &'static str = "memif";
}

/// MAC-instance id scope (formats as `02:xx:xx:xx:xx:xx`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacInstance;
impl Scope for MacInstance {
    const NAME: &'static str = "mac-instance";
}

/// veth id scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Veth;
impl Scope for Veth {
    const NAME: &'static str = "veth";
}

/// A `u32` id tagged at compile time with the [`Scope`] it was allocated from.
#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(bound = ""))]
pub struct ScopedId<S>(u32, PhantomData<S>);

impl<S> Clone for ScopedId<S> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<S> Copy for ScopedId<S> {}
impl<S> PartialEq for ScopedId<S> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<S> Eq for ScopedId<S> {}
impl<S> PartialOrd for ScopedId<S> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<S> Ord for ScopedId<S> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}
impl<S> core::hash::Hash for ScopedId<S> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<S> Debug for ScopedId<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S> Display for ScopedId<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<S> ScopedId<S> {
    /// Get the raw `u32` value of this id.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    const fn from_u32(value: u32) -> Self {
        ScopedId(value, PhantomData)
    }
}

impl<S> From<u32> for ScopedId<S> {
    fn from(value: u32) -> Self {
        ScopedId::from_u32(value)
    }
}

/// A VLAN/VNI id.
pub type VlanId = ScopedId<Vlan>;
/// A memif id.
pub type MemifId = ScopedId<Memif>;
/// A MAC-instance id.
pub type MacInstanceId = ScopedId<MacInstance>;
/// A veth id.
pub type VethId = ScopedId<Veth>;

/// Errors which can occur while allocating an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// The scope's `u32` counter would have wrapped past `u32::MAX`.
    #[error("{scope} id counter exhausted")]
    CounterExhausted {
        /// The scope whose counter was exhausted.
        scope: &'static str,
    },
}

/// A monotonic counter plus the key-to-id bindings it has handed out, scoped to `S`.
///
/// `Allocate(scope, key)` (§4.A): returns the existing id bound to `key` if one
/// exists, otherwise increments the counter, binds it, and returns the new id.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Allocator<S, K> {
    next: u32,
    bindings: BTreeMap<K, ScopedId<S>>,
}

impl<S, K> Default for Allocator<S, K> {
    fn default() -> Self {
        Allocator {
            next: 0,
            bindings: BTreeMap::new(),
        }
    }
}

impl<S: Scope, K: Ord + Clone> Allocator<S, K> {
    /// Create an empty allocator, counter starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the counter to `value` if, and only if, no binding has been made yet.
    ///
    /// Used exactly once, by `SetSystemParameters`, to seed the VLAN scope to
    /// `starting_vlan_id - 1`. A second call after any binding exists is a no-op,
    /// matching "never re-seeded".
    pub fn seed_if_unused(&mut self, value: u32) {
        if self.bindings.is_empty() {
            self.next = value;
        }
    }

    /// Reconstruct an allocator from persisted bindings after a restart.
    ///
    /// The counter is **not** persisted individually; it is rebuilt as
    /// `max(id)` over all bindings, per §4.A.
    #[must_use]
    pub fn restore(bindings: BTreeMap<K, ScopedId<S>>) -> Self {
        let next = bindings.values().map(|id| id.0).max().unwrap_or(0);
        Allocator { next, bindings }
    }

    /// Return the existing id bound to `key`, or allocate and bind a new one.
    pub fn allocate(&mut self, key: K) -> Result<ScopedId<S>, AllocationError> {
        if let Some(id) = self.bindings.get(&key) {
            return Ok(*id);
        }
        let next = self
            .next
            .checked_add(1)
            .ok_or(AllocationError::CounterExhausted { scope: S::NAME })?;
        self.next = next;
        let id = ScopedId::from_u32(next);
        self.bindings.insert(key, id);
        Ok(id)
    }

    /// Look up the id bound to `key`, without allocating one.
    pub fn get(&self, key: &K) -> Option<ScopedId<S>> {
        self.bindings.get(key).copied()
    }

    /// All bindings currently held by this allocator.
    #[must_use]
    pub fn bindings(&self) -> &BTreeMap<K, ScopedId<S>> {
        &self.bindings
    }
}

/// Format a [`MacInstanceId`] as a [`Mac`]: `02:00:xx:xx:xx:xx`, the low four
/// bytes being the big-endian id (the fifth, most-significant, byte of the
/// "low five bytes" is always zero since ids are `u32`).
#[must_use]
pub fn format_mac_instance(id: MacInstanceId) -> Mac {
    let b = id.as_u32().to_be_bytes();
    Mac::from([0x02, 0x00, b[0], b[1], b[2], b[3]])
}

/// Recover the [`MacInstanceId`] encoded in a [`Mac`] produced by [`format_mac_instance`].
///
/// Returns `None` if `mac` was not produced by [`format_mac_instance`] (wrong prefix).
#[must_use]
pub fn mac_instance_id(mac: Mac) -> Option<MacInstanceId> {
    let bytes: [u8; 6] = mac.into();
    if bytes[0] != 0x02 || bytes[1] != 0x00 {
        return None;
    }
    let id = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
    Some(ScopedId::from_u32(id))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn allocate_is_monotonic_and_stable() {
        let mut a: Allocator<Memif, &str> = Allocator::new();
        let first = a.allocate("a").unwrap();
        let second = a.allocate("b").unwrap();
        assert_ne!(first, second);
        assert_eq!(a.allocate("a").unwrap(), first);
        assert_eq!(first.as_u32(), 1);
        assert_eq!(second.as_u32(), 2);
    }

    #[test]
    fn vlan_seed_applies_once() {
        let mut a: Allocator<Vlan, &str> = Allocator::new();
        a.seed_if_unused(4999);
        let first = a.allocate("he-a~he-b").unwrap();
        assert_eq!(first.as_u32(), 5000);
        a.seed_if_unused(9999);
        let second = a.allocate("he-a~he-c").unwrap();
        assert_eq!(second.as_u32(), 5001);
    }

    #[test]
    fn restore_reconstructs_counter_as_max_of_bindings() {
        let mut bindings = BTreeMap::new();
        bindings.insert("a", ScopedId::<Veth>::from_u32(7));
        bindings.insert("b", ScopedId::<Veth>::from_u32(3));
        let mut a: Allocator<Veth, &str> = Allocator::restore(bindings);
        let next = a.allocate("c").unwrap();
        assert_eq!(next.as_u32(), 8);
    }

    #[test]
    fn mac_instance_round_trips() {
        bolero::check!().with_type().for_each(|raw: &u32| {
            let id = ScopedId::<MacInstance>::from_u32(*raw);
            let mac = format_mac_instance(id);
            assert_eq!(format!("{mac}").as_bytes()[0], b'0');
            assert_eq!(mac_instance_id(mac), Some(id));
        });
    }

    #[test]
    fn counter_exhaustion_is_reported() {
        let mut bindings = BTreeMap::new();
        bindings.insert("a", ScopedId::<Veth>::from_u32(u32::MAX));
        let mut a: Allocator<Veth, &str> = Allocator::restore(bindings);
        assert_eq!(
            a.allocate("b"),
            Err(AllocationError::CounterExhausted { scope: Veth::NAME })
        );
    }
}
