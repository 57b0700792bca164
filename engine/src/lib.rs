// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The wiring engine (§4.E) and reconciler (§4.G): the policy core that
//! dispatches declarative input to the resource builders, allocates ids and
//! addresses, writes through the store gateway, and brackets a cycle's
//! writes with a before/after diff.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_arguments)]

mod external;
mod reconcile;
mod sfc;

pub use external::{ExternalDriver, LoggingExternalDriver};
pub use reconcile::{DesiredState, ReconcileReport};

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use cache::Cache;
use model::errors::{AllocationError, BuilderError, ConfigError, StoreError};
use model::input::{BridgeDomainDefaults, ExternalEntity, HostEntity, SystemParameters};
use model::resource::{strip_slash, Interface, InterfaceKind, Resource};
use model::sfc::BridgeParameters;
use model::{MacInstanceBindings, SFCIDs, SfcIdKey, VlanBindings};
use net::eth::mac::Mac;
use store::StoreGateway;
use thiserror::Error;

/// The union of reasons an engine operation can fail (§7).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The declarative input was malformed: a dangling reference, an
    /// illegal element count, a missing mandatory parameter.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An id counter wrapped, or IPAM ran out of addresses.
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    /// The store gateway could not read or write a key.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A resource builder's invariant was violated.
    #[error(transparent)]
    Builder(#[from] BuilderError),
}

/// Translate a [`BridgeParameters`] override into [`BridgeDomainDefaults`].
fn bridge_defaults_from(parms: BridgeParameters) -> BridgeDomainDefaults {
    BridgeDomainDefaults {
        flood: parms.flood,
        uu_flood: parms.uu_flood,
        forward: parms.forward,
        learn: parms.learn,
        arp_term: parms.arp_term,
        mac_age: parms.mac_age,
    }
}

/// The engine's full mutable state: cached system parameters, the
/// declarative registries `WireHost`/`WireHostToExternal` read from, the
/// four persisted id-binding tables, IPAM, the derived-state cache, and the
/// store gateway every wiring operation writes through.
pub struct Engine<D: ExternalDriver = LoggingExternalDriver> {
    system_parameters: SystemParameters,
    hosts: BTreeMap<String, HostEntity>,
    externals: BTreeMap<String, ExternalEntity>,
    mac_ids: MacInstanceBindings,
    vlan_ids: VlanBindings,
    memif_ids: id::Allocator<id::Memif, String>,
    veth_ids: id::Allocator<id::Veth, String>,
    sfc_ids: SFCIDs,
    ipam: ipam::Ipam,
    cache: Cache,
    store: StoreGateway,
    driver: D,
}

impl Engine<LoggingExternalDriver> {
    /// A fresh engine with the default, logging-only external driver.
    #[must_use]
    pub fn new() -> Self {
        Self::with_driver(LoggingExternalDriver)
    }
}

impl Default for Engine<LoggingExternalDriver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ExternalDriver> Engine<D> {
    /// A fresh engine driven by a custom [`ExternalDriver`].
    #[must_use]
    pub fn with_driver(driver: D) -> Self {
        Engine {
            system_parameters: SystemParameters::default(),
            hosts: BTreeMap::new(),
            externals: BTreeMap::new(),
            mac_ids: MacInstanceBindings::new(),
            vlan_ids: VlanBindings::new(),
            memif_ids: id::Allocator::new(),
            veth_ids: id::Allocator::new(),
            sfc_ids: SFCIDs::new(),
            ipam: ipam::Ipam::new(),
            cache: Cache::new(),
            store: StoreGateway::new(),
            driver,
        }
    }

    /// Read access to the store gateway, e.g. for a controller admin
    /// surface or a test assertion.
    #[must_use]
    pub fn store(&self) -> &StoreGateway {
        &self.store
    }

    /// `SetSystemParameters(sp)`: caches `sp` and seeds the VLAN/VNI counter
    /// once, on its very first call.
    pub fn set_system_parameters(&mut self, sp: SystemParameters) {
        self.vlan_ids.seed_if_unused(sp.starting_vlan_id.saturating_sub(1));
        self.system_parameters = sp;
    }

    /// Register `ee` so later `WireHostToExternal`/`WireSfc` calls can
    /// resolve it. Purely bookkeeping; no dataplane objects are created.
    pub fn register_external(&mut self, ee: ExternalEntity) {
        self.externals.insert(ee.name.clone(), ee);
    }

    /// `WireHost(he)`: creates `he`'s NIC (if configured), its loopback
    /// (allocating a MAC-instance id if none was supplied), and its two
    /// default east-west bridges.
    pub fn wire_host(&mut self, he: HostEntity) -> Result<(), EngineError> {
        let name = he.name.clone();

        let loopback_mac = match he.loopback_mac {
            Some(mac) => mac,
            None => {
                let id = self
                    .mac_ids
                    .allocate_host_loopback(name.clone())
                    .map_err(AllocationError::from)?;
                id::format_mac_instance(id)
            }
        };
        let loopback = builders::build_interface(
            builders::InterfaceParams {
                name: "loop0".to_string(),
                kind: InterfaceKind::Loopback,
                phy_address: Some(loopback_mac),
                ipv4: he.loopback_ipv4.into_iter().collect(),
                ipv6: he.loopback_ipv6.into_iter().collect(),
                mtu: he.mtu,
                rx_mode: he.rx_mode,
            },
            self.system_parameters.mtu,
        );
        self.store
            .put(store::keys::interface(&name, "loop0"), Resource::Interface(loopback))?;

        if let Some(eth_if_name) = he.eth_if_name.clone() {
            let eth = builders::build_interface(
                builders::InterfaceParams {
                    name: eth_if_name.clone(),
                    kind: InterfaceKind::Ethernet,
                    phy_address: None,
                    ipv4: he.eth_ipv4.into_iter().collect(),
                    ipv6: he.eth_ipv6.into_iter().collect(),
                    mtu: he.mtu,
                    rx_mode: he.rx_mode,
                },
                self.system_parameters.mtu,
            );
            self.store
                .put(store::keys::interface(&name, &eth_if_name), Resource::Interface(eth))?;
        }

        let dynamic_bridge = format!("bd-ew-dyn-{name}");
        let static_bridge = format!("bd-ew-static-{name}");
        self.store.put(
            store::keys::bridge_domain(&name, &dynamic_bridge),
            Resource::BridgeDomain(builders::build_bridge_domain(
                &dynamic_bridge,
                self.system_parameters.dynamic_bridge,
            )),
        )?;
        self.store.put(
            store::keys::bridge_domain(&name, &static_bridge),
            Resource::BridgeDomain(builders::build_bridge_domain(
                &static_bridge,
                self.system_parameters.static_bridge,
            )),
        )?;

        self.cache.register_host(
            name.clone(),
            cache::HostBridges {
                dynamic_bridge,
                static_bridge,
            },
        );
        self.hosts.insert(name, he);
        Ok(())
    }

    /// `WireHostPair(src, dst)`: records the edge with all sub-resources
    /// nil. Creation is deferred to the first SFC that needs it.
    pub fn wire_host_pair(&mut self, src: &str, dst: &str) -> Result<(), EngineError> {
        self.require_host(src)?;
        self.require_host(dst)?;
        let _ = self.cache.he_to_he_mut(src, dst);
        Ok(())
    }

    /// `WireHostToExternal(he, ee)`: records the edge with all
    /// sub-resources nil.
    pub fn wire_host_to_external(&mut self, he: &str, ee: &str) -> Result<(), EngineError> {
        self.require_host(he)?;
        if !self.externals.contains_key(ee) {
            return Err(ConfigError::NoSuchExternalEntity(ee.to_string()).into());
        }
        let _ = self.cache.he_to_ee_mut(he, ee);
        Ok(())
    }

    fn require_host(&self, he: &str) -> Result<(), EngineError> {
        if self.hosts.contains_key(he) {
            Ok(())
        } else {
            Err(ConfigError::NoSuchHost(he.to_string()).into())
        }
    }

    /// Lazily create the VXLAN tunnel, optional static route, and anchor
    /// bridge domain toward external entity `ee`, calling the external
    /// driver the first time the bridge is created. Returns the bridge name.
    fn ensure_vxlan_and_bridge_to_ee(&mut self, he: &str, ee: &str) -> Result<String, EngineError> {
        if let Some(bridge) = self.cache.he_to_ee(he, ee).and_then(|edge| edge.bridge.clone()) {
            return Ok(bridge);
        }
        let vni = self
            .vlan_ids
            .allocate_he_to_ee(he, ee)
            .map_err(AllocationError::from)?
            .as_u32();
        let host = self.hosts.get(he).cloned().ok_or_else(|| ConfigError::NoSuchHost(he.to_string()))?;
        let external = self
            .externals
            .get(ee)
            .cloned()
            .ok_or_else(|| ConfigError::NoSuchExternalEntity(ee.to_string()))?;
        let src = host
            .vxlan_tunnel_ipv4
            .ok_or(ConfigError::MissingParameter("host.vxlan_tunnel_ipv4"))?;
        let dst = external
            .host_vxlan
            .source_ipv4
            .ok_or(ConfigError::MissingParameter("external_entity.host_vxlan.source_ipv4"))?;

        let vxlan_name = format!("vxlan-{he}-{ee}");
        let iface = builders::build_vxlan_tunnel(&vxlan_name, &src.to_string(), &dst.to_string(), vni, self.system_parameters.mtu)?;
        self.store
            .put(store::keys::interface(he, &vxlan_name), Resource::Interface(iface))?;
        self.cache.he_to_ee_mut(he, ee).vxlan_if = Some(vxlan_name.clone());

        let mut route_description = None;
        if host.create_vxlan_static_route {
            let description = format!("{he}->{ee}");
            let route = builders::build_static_route(
                0,
                description.clone(),
                dst,
                32,
                &dst.to_string(),
                &vxlan_name,
                self.system_parameters.default_route_weight,
                self.system_parameters.default_route_preference,
            )?;
            self.store.put(store::keys::route(he, &description), Resource::StaticRoute(route))?;
            self.cache.he_to_ee_mut(he, ee).route = Some(description.clone());
            route_description = Some(description);
        }

        let bridge_name = format!("bd-ns-{he}-{ee}");
        self.store.reconcile_bridge_domain(
            store::keys::bridge_domain(he, &bridge_name),
            &bridge_name,
            self.system_parameters.dynamic_bridge,
            &vxlan_name,
        )?;
        self.cache.he_to_ee_mut(he, ee).bridge = Some(bridge_name.clone());

        self.driver
            .wire_external_to_host(ee, he, vni, route_description.as_deref())?;

        Ok(bridge_name)
    }

    /// Lazily create the VXLAN tunnel and anchor bridge domain from `he`
    /// toward host `partner`. The VNI is shared with the mirror edge in the
    /// opposite direction; the tunnel interface and bridge are not (each
    /// host gets its own).
    fn ensure_vxlan_and_bridge_to_he(&mut self, he: &str, partner: &str) -> Result<String, EngineError> {
        if let Some(bridge) = self.cache.he_to_he(he, partner).and_then(|edge| edge.bridge.clone()) {
            return Ok(bridge);
        }
        let (a, b) = if he <= partner { (he, partner) } else { (partner, he) };
        let vni = self
            .vlan_ids
            .allocate_he_to_he(a, b)
            .map_err(AllocationError::from)?
            .as_u32();
        let host = self.hosts.get(he).cloned().ok_or_else(|| ConfigError::NoSuchHost(he.to_string()))?;
        let partner_host = self
            .hosts
            .get(partner)
            .cloned()
            .ok_or_else(|| ConfigError::NoSuchHost(partner.to_string()))?;
        let src = host
            .vxlan_tunnel_ipv4
            .ok_or(ConfigError::MissingParameter("host.vxlan_tunnel_ipv4"))?;
        let dst = partner_host
            .vxlan_tunnel_ipv4
            .ok_or(ConfigError::MissingParameter("partner.vxlan_tunnel_ipv4"))?;

        let vxlan_name = format!("vxlan-{he}-{partner}");
        let iface = builders::build_vxlan_tunnel(&vxlan_name, &src.to_string(), &dst.to_string(), vni, self.system_parameters.mtu)?;
        self.store
            .put(store::keys::interface(he, &vxlan_name), Resource::Interface(iface))?;
        self.cache.he_to_he_mut(he, partner).vxlan_if = Some(vxlan_name.clone());

        if host.create_vxlan_static_route {
            let description = format!("{he}->{partner}");
            let route = builders::build_static_route(
                0,
                description.clone(),
                dst,
                32,
                &dst.to_string(),
                &vxlan_name,
                self.system_parameters.default_route_weight,
                self.system_parameters.default_route_preference,
            )?;
            self.store.put(store::keys::route(he, &description), Resource::StaticRoute(route))?;
            self.cache.he_to_he_mut(he, partner).route = Some(description);
        }

        let bridge_name = format!("bd-ns-{he}-{partner}");
        self.store.reconcile_bridge_domain(
            store::keys::bridge_domain(he, &bridge_name),
            &bridge_name,
            self.system_parameters.dynamic_bridge,
            &vxlan_name,
        )?;
        self.cache.he_to_he_mut(he, partner).bridge = Some(bridge_name.clone());

        Ok(bridge_name)
    }

    /// Resolve an element's IPv4 address: explicit value if given (marking
    /// its host-id used in IPAM when `sfc_ipv4_prefix` is set), else an
    /// IPAM auto-allocation reusing a persisted `SFCIDs[..].ip_id` if one
    /// exists.
    fn resolve_element_ipv4(
        &mut self,
        sfc: &model::SfcEntity,
        key: &SfcIdKey,
        explicit: Option<Ipv4Addr>,
    ) -> Result<Option<Ipv4Addr>, EngineError> {
        let Some(prefix) = sfc.sfc_ipv4_prefix.as_ref() else {
            return Ok(explicit);
        };
        if let Some(addr) = explicit {
            self.ipam.set_ip_addr_if_inside_subnet(prefix, addr);
            return Ok(Some(addr));
        }
        if let Some(id) = self.sfc_ids.get(key).and_then(|b| b.ip_id) {
            let addr = self.ipam.set_ip_id_in_subnet(prefix, id).map_err(AllocationError::from)?;
            return Ok(Some(addr));
        }
        let (id, addr_with_prefix) = self.ipam.allocate_from_subnet(prefix).map_err(AllocationError::from)?;
        self.sfc_ids.entry(key.clone()).ip_id = Some(id);
        let addr: Ipv4Addr = strip_slash(&addr_with_prefix)
            .parse()
            .map_err(|_| BuilderError::InvariantViolation(format!("ipam returned invalid address '{addr_with_prefix}'")))?;
        Ok(Some(addr))
    }

    /// Resolve an element's MAC: explicit value if given, else a
    /// MAC-instance id auto-allocation reusing a persisted
    /// `SFCIDs[..].mac_addr_id` if one exists.
    fn resolve_element_mac(&mut self, key: &SfcIdKey, explicit: Option<Mac>) -> Result<Mac, EngineError> {
        if let Some(mac) = explicit {
            return Ok(mac);
        }
        if let Some(id) = self.sfc_ids.get(key).and_then(|b| b.mac_addr_id) {
            return Ok(id::format_mac_instance(id));
        }
        let id = self
            .mac_ids
            .allocate_sfc_port(key.clone())
            .map_err(AllocationError::from)?;
        self.sfc_ids.entry(key.clone()).mac_addr_id = Some(id);
        Ok(id::format_mac_instance(id))
    }

    fn resolve_element_address(
        &mut self,
        sfc: &model::SfcEntity,
        key: &SfcIdKey,
        el: &model::SfcElement,
    ) -> Result<(Option<Ipv4Addr>, Mac), EngineError> {
        let ipv4 = self.resolve_element_ipv4(sfc, key, el.ipv4)?;
        let mac = self.resolve_element_mac(key, el.mac)?;
        Ok((ipv4, mac))
    }

    /// Ensure `el`'s vSwitch-end interface exists on `he`, creating (and
    /// persisting, in `SFCIDs`) a fresh memif or veth/af-packet id if this
    /// element has not been attached before. Returns the interface name to
    /// add to a bridge domain or cross-connect.
    fn ensure_vswitch_interface(
        &mut self,
        sfc: &model::SfcEntity,
        el: &model::SfcElement,
        he: &str,
    ) -> Result<String, EngineError> {
        let key = SfcIdKey::new(sfc.name.clone(), el.container.clone(), el.port_label.clone());
        let kind = el.kind.ok_or(ConfigError::MissingParameter("element.kind"))?;
        let (ipv4, mac) = self.resolve_element_address(sfc, &key, el)?;

        if kind.is_memif() {
            let memif_id = match self.sfc_ids.get(&key).and_then(|b| b.memif_id) {
                Some(id) => id,
                None => {
                    let pair_key = format!("{}/{}/{}", sfc.name, el.container, el.port_label);
                    let id = self.memif_ids.allocate(pair_key).map_err(AllocationError::from)?;
                    self.sfc_ids.entry(key.clone()).memif_id = Some(id);
                    id
                }
            };
            let name = format!("memif{}/0", memif_id.as_u32());
            let iface = builders::build_interface(
                builders::InterfaceParams {
                    name: name.clone(),
                    kind: InterfaceKind::Memif {
                        memif_id: memif_id.as_u32(),
                        is_master: true,
                    },
                    phy_address: Some(mac),
                    ipv4: ipv4.into_iter().collect(),
                    ipv6: Vec::new(),
                    mtu: el.mtu,
                    rx_mode: el.rx_mode,
                },
                self.system_parameters.mtu,
            );
            self.store.put(store::keys::interface(he, &name), Resource::Interface(iface))?;
            Ok(name)
        } else {
            let veth_id = match self.sfc_ids.get(&key).and_then(|b| b.veth_id) {
                Some(id) => id,
                None => {
                    let pair_key = format!("{}/{}/{}", sfc.name, el.container, el.port_label);
                    let id = self.veth_ids.allocate(pair_key).map_err(AllocationError::from)?;
                    self.sfc_ids.entry(key.clone()).veth_id = Some(id);
                    id
                }
            };
            let veth_name = format!("veth{}", veth_id.as_u32());
            let peer_name = format!("veth{}-peer", veth_id.as_u32());
            let host_if = format!("afpacket{}", veth_id.as_u32());
            let veth = builders::build_linux_veth(
                builders::LinuxVethParams {
                    name: veth_name.clone(),
                    peer_name,
                    host_if_name: host_if.clone(),
                    container_namespace: el.container.clone(),
                    mac: Some(mac),
                    ipv4: ipv4.into_iter().collect(),
                    ipv6: Vec::new(),
                    mtu: el.mtu,
                },
                self.system_parameters.mtu,
            );
            self.store
                .put(store::keys::linux_interface(he, &veth_name), Resource::LinuxVeth(veth))?;
            let af_iface = Interface {
                name: host_if.clone(),
                kind: InterfaceKind::AfPacket { host_if: veth_name },
                enabled: true,
                phy_address: None,
                ipv4: Vec::new(),
                ipv6: Vec::new(),
                mtu: self.system_parameters.mtu,
                rx_mode: builders::translate_rx_mode(el.rx_mode),
            };
            self.store
                .put(store::keys::interface(he, &host_if), Resource::Interface(af_iface))?;
            Ok(host_if)
        }
    }

    /// Join `el`'s vSwitch-end interface into bridge domain `bridge_name` on
    /// `he`, creating the interface first if needed, and install any
    /// L2-FIB entries the element declares. Returns the interface name.
    fn attach_element_to_bridge(
        &mut self,
        sfc: &model::SfcEntity,
        el: &model::SfcElement,
        he: &str,
        bridge_name: &str,
        defaults: BridgeDomainDefaults,
    ) -> Result<String, EngineError> {
        let vswitch_if = self.ensure_vswitch_interface(sfc, el, he)?;
        self.store
            .reconcile_bridge_domain(store::keys::bridge_domain(he, bridge_name), bridge_name, defaults, &vswitch_if)?;
        for mac in &el.l2fib_macs {
            let entry = builders::build_l2fib_entry(bridge_name, *mac, &vswitch_if);
            self.store.put(store::keys::l2fib(he, bridge_name, mac), Resource::L2FibEntry(entry))?;
        }
        Ok(vswitch_if)
    }
}
