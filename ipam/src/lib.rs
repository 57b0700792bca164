// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IP address management (§4.B): allocates an IP host-id inside a declared IPv4
//! prefix, enforces non-collision, and resolves explicit ids back to addresses.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use lpm::prefix::Prefix;
use tracing::trace;

/// Errors which may occur while allocating or resolving addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IpamError {
    /// The subnet has not yet been touched by any allocator call.
    #[error("prefix not configured")]
    PrefixNotConfigured,
    /// The requested host-id does not fit in the subnet's host bits, or names
    /// the reserved network (0) or broadcast host-id.
    #[error("host-id out of range for this subnet")]
    IdOutOfRange,
    /// The subnet has no remaining unused host-ids.
    #[error("subnet exhausted")]
    Exhausted,
}

/// Per-subnet sparse set of used host-ids.
#[derive(Debug, Default)]
struct SubnetAllocator {
    used: BTreeSet<u32>,
}

impl SubnetAllocator {
    fn host_bits(prefix: &Prefix) -> u32 {
        32 - u32::from(prefix.length())
    }

    /// Highest legal host-id (the broadcast id) for this subnet.
    fn broadcast_id(prefix: &Prefix) -> u32 {
        if Self::host_bits(prefix) >= 32 {
            u32::MAX
        } else {
            (1u32 << Self::host_bits(prefix)) - 1
        }
    }

    fn network_u32(prefix: &Prefix) -> u32 {
        match prefix.as_address() {
            std::net::IpAddr::V4(addr) => u32::from(addr),
            std::net::IpAddr::V6(_) => unreachable!("ipam only supports IPv4 prefixes"),
        }
    }

    fn address_for(prefix: &Prefix, id: u32) -> Ipv4Addr {
        Ipv4Addr::from(Self::network_u32(prefix) | id)
    }

    fn validate_id(prefix: &Prefix, id: u32) -> Result<(), IpamError> {
        if id == 0 || id > Self::broadcast_id(prefix) {
            return Err(IpamError::IdOutOfRange);
        }
        Ok(())
    }

    fn allocate(&mut self, prefix: &Prefix) -> Result<(u32, Ipv4Addr), IpamError> {
        let broadcast = Self::broadcast_id(prefix);
        let mut candidate = 1u32;
        loop {
            if candidate >= broadcast {
                return Err(IpamError::Exhausted);
            }
            if !self.used.contains(&candidate) {
                self.used.insert(candidate);
                return Ok((candidate, Self::address_for(prefix, candidate)));
            }
            candidate += 1;
        }
    }

    fn set_id(&mut self, prefix: &Prefix, id: u32) -> Result<Ipv4Addr, IpamError> {
        Self::validate_id(prefix, id)?;
        self.used.insert(id);
        Ok(Self::address_for(prefix, id))
    }

    fn set_addr_if_inside(&mut self, prefix: &Prefix, addr: Ipv4Addr) {
        if !prefix.covers_addr(&std::net::IpAddr::V4(addr)) {
            return;
        }
        let id = u32::from(addr) & Self::broadcast_id(prefix);
        self.used.insert(id);
    }
}

/// IP address manager: tracks one sparse host-id bitmap per configured IPv4 subnet.
#[derive(Debug, Default)]
pub struct Ipam {
    subnets: BTreeMap<Prefix, SubnetAllocator>,
}

impl Ipam {
    /// Create an empty address manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next unused host-id inside `prefix`, returning the id and
    /// its address in `addr/prefixlen` textual form.
    pub fn allocate_from_subnet(&mut self, prefix: &Prefix) -> Result<(u32, String), IpamError> {
        let allocator = self.subnets.entry(*prefix).or_default();
        let (id, addr) = allocator.allocate(prefix)?;
        trace!(%addr, id, "allocated host-id from subnet");
        Ok((id, format!("{addr}/{}", prefix.length())))
    }

    /// Bind `id` inside `prefix`, returning its address and marking the id
    /// used. Idempotent: calling again with the same id returns the same
    /// address (this is how the engine re-applies a persisted `SFCIDs` binding
    /// across reconcile cycles without tripping a collision).
    pub fn set_ip_id_in_subnet(
        &mut self,
        prefix: &Prefix,
        id: u32,
    ) -> Result<Ipv4Addr, IpamError> {
        let allocator = self.subnets.entry(*prefix).or_default();
        allocator.set_id(prefix, id)
    }

    /// Mark the host-id of `addr` as used, provided `addr` actually lies
    /// inside `prefix`. Silently ignored otherwise (per §4.B).
    pub fn set_ip_addr_if_inside_subnet(&mut self, prefix: &Prefix, addr: Ipv4Addr) {
        let allocator = self.subnets.entry(*prefix).or_default();
        allocator.set_addr_if_inside(prefix, addr);
    }

    /// Resolve a previously-allocated host-id back to its address.
    ///
    /// Returns [`IpamError::PrefixNotConfigured`] if no allocator call has
    /// ever touched `prefix`.
    pub fn resolve(&self, prefix: &Prefix, id: u32) -> Result<Ipv4Addr, IpamError> {
        let allocator = self
            .subnets
            .get(prefix)
            .ok_or(IpamError::PrefixNotConfigured)?;
        SubnetAllocator::validate_id(prefix, id)?;
        if !allocator.used.contains(&id) {
            return Err(IpamError::IdOutOfRange);
        }
        Ok(SubnetAllocator::address_for(prefix, id))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn prefix24(a: u8, b: u8, c: u8) -> Prefix {
        Prefix::try_from((Ipv4Addr::new(a, b, c, 0).into(), 24)).expect("valid /24")
    }

    #[test]
    fn allocate_from_subnet_skips_network_and_broadcast() {
        let mut ipam = Ipam::new();
        let prefix = prefix24(10, 0, 1, 0);
        let (id, addr) = ipam.allocate_from_subnet(&prefix).unwrap();
        assert_eq!(id, 1);
        assert_eq!(addr, "10.0.1.1/24");
    }

    #[test]
    fn scenario_auto_ip_inside_prefix() {
        let mut ipam = Ipam::new();
        let prefix = prefix24(10, 0, 1, 0);
        let first = ipam.allocate_from_subnet(&prefix).unwrap();
        let second = ipam.allocate_from_subnet(&prefix).unwrap();
        let third = ipam.allocate_from_subnet(&prefix).unwrap();
        assert_eq!((first.1.as_str(), second.1.as_str(), third.1.as_str()), (
            "10.0.1.1/24",
            "10.0.1.2/24",
            "10.0.1.3/24",
        ));

        // a container declares its own .7 out of band
        ipam.set_ip_addr_if_inside_subnet(&prefix, Ipv4Addr::new(10, 0, 1, 7));
        let fourth = ipam.allocate_from_subnet(&prefix).unwrap();
        assert_eq!(fourth.1, "10.0.1.4/24");
    }

    #[test]
    fn set_ip_id_in_subnet_is_idempotent() {
        let mut ipam = Ipam::new();
        let prefix = prefix24(10, 0, 2, 0);
        let first = ipam.set_ip_id_in_subnet(&prefix, 5).unwrap();
        let second = ipam.set_ip_id_in_subnet(&prefix, 5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn out_of_subnet_address_is_ignored() {
        let mut ipam = Ipam::new();
        let prefix = prefix24(10, 0, 3, 0);
        ipam.set_ip_addr_if_inside_subnet(&prefix, Ipv4Addr::new(192, 168, 1, 1));
        let (id, _) = ipam.allocate_from_subnet(&prefix).unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn resolve_requires_configured_prefix() {
        let ipam = Ipam::new();
        let prefix = prefix24(10, 0, 4, 0);
        assert_eq!(ipam.resolve(&prefix, 1), Err(IpamError::PrefixNotConfigured));
    }

    #[test]
    fn zero_and_broadcast_are_reserved() {
        let mut ipam = Ipam::new();
        let prefix = prefix24(10, 0, 5, 0);
        assert_eq!(
            ipam.set_ip_id_in_subnet(&prefix, 0),
            Err(IpamError::IdOutOfRange)
        );
        assert_eq!(
            ipam.set_ip_id_in_subnet(&prefix, 255),
            Err(IpamError::IdOutOfRange)
        );
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut ipam = Ipam::new();
        let prefix = Prefix::try_from((Ipv4Addr::new(10, 0, 6, 0).into(), 30)).expect("valid /30");
        // /30 has 2 usable host-ids (1, 2); 3 is broadcast
        assert!(ipam.allocate_from_subnet(&prefix).is_ok());
        assert!(ipam.allocate_from_subnet(&prefix).is_ok());
        assert_eq!(ipam.allocate_from_subnet(&prefix), Err(IpamError::Exhausted));
    }
}
