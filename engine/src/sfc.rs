// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `WireSfc` dispatch (§4.E): the ten [`model::SfcType`] variants collapse to
//! three wiring algorithms — north-south over VXLAN, north-south over a NIC,
//! and east-west (direct pairing, shared bridge, or cross-connect chain).

use model::errors::ConfigError;
use model::resource::{InterfaceKind, Resource};
use model::{ElementKind, SfcElement, SfcEntity, SfcType};

use crate::{bridge_defaults_from, Engine, EngineError, ExternalDriver};

impl<D: ExternalDriver> Engine<D> {
    /// Dispatch `sfc` to the algorithm its [`SfcType`] selects.
    pub fn wire_sfc(&mut self, sfc: SfcEntity) -> Result<(), EngineError> {
        match sfc.sfc_type {
            SfcType::NsVxlan => self.wire_ns_vxlan(&sfc),
            SfcType::NsNicBd | SfcType::NsNicL2Xconn | SfcType::NsNicVrf => self.wire_ns_nic(&sfc),
            SfcType::EwMemif | SfcType::EwVeth => self.wire_ew_memif(&sfc),
            SfcType::EwBd | SfcType::EwVrf => self.wire_ew_bd(&sfc, false),
            SfcType::EwBdL2Fib => self.wire_ew_bd(&sfc, true),
            SfcType::EwL2Xconn => self.wire_ew_l2xconn(&sfc),
        }
    }

    /// North-south, tunneled over VXLAN (`SFC_NS_VXLAN`): at most one
    /// external entity and/or one destination host, every other element a
    /// container joined to the bridge(s) anchoring those tunnels.
    fn wire_ns_vxlan(&mut self, sfc: &SfcEntity) -> Result<(), EngineError> {
        let mut ee_name = None;
        let mut he_name = None;
        for el in &sfc.elements {
            match el.kind {
                Some(ElementKind::ExternalEntity) => {
                    if ee_name.is_some() {
                        return Err(ConfigError::TooManyExternalEntities(sfc.name.clone()).into());
                    }
                    ee_name = Some(el.container.clone());
                }
                Some(ElementKind::HostEntity) => {
                    if he_name.is_some() {
                        return Err(ConfigError::TooManyDestinationHosts(sfc.name.clone()).into());
                    }
                    he_name = Some(el.container.clone());
                }
                _ => {}
            }
        }
        if ee_name.is_none() && he_name.is_none() {
            return Err(ConfigError::NoDestination(sfc.name.clone()).into());
        }

        let containers: Vec<&SfcElement> = sfc
            .elements
            .iter()
            .filter(|e| !matches!(e.kind, Some(ElementKind::ExternalEntity) | Some(ElementKind::HostEntity)))
            .collect();

        for el in containers {
            let he = el.etcd_vpp_switch_key.clone();
            self.require_host(&he)?;
            let defaults = self.system_parameters.dynamic_bridge;
            if let Some(ee) = &ee_name {
                let bridge = self.ensure_vxlan_and_bridge_to_ee(&he, ee)?;
                self.attach_element_to_bridge(sfc, el, &he, &bridge, defaults)?;
            }
            if let Some(partner) = &he_name {
                let bridge = self.ensure_vxlan_and_bridge_to_he(&he, partner)?;
                self.attach_element_to_bridge(sfc, el, &he, &bridge, defaults)?;
            }
        }
        Ok(())
    }

    /// North-south, NIC-attached (`SFC_NS_NIC_BD`/`_L2XCONN`/`_VRF`): exactly
    /// one destination host, a physical NIC interface on it, and every
    /// container joined to it a bridge, a cross-connect, or a VRF route away.
    fn wire_ns_nic(&mut self, sfc: &SfcEntity) -> Result<(), EngineError> {
        let mut he_name = None;
        for el in &sfc.elements {
            if el.kind == Some(ElementKind::HostEntity) {
                if he_name.is_some() {
                    return Err(ConfigError::TooManyDestinationHosts(sfc.name.clone()).into());
                }
                he_name = Some(el.container.clone());
            }
        }
        let he = he_name.ok_or_else(|| ConfigError::NoDestination(sfc.name.clone()))?;
        self.require_host(&he)?;

        let nic_name = format!("nic-{}", sfc.name);
        let mtu = self.system_parameters.mtu;
        let nic = builders::build_interface(
            builders::InterfaceParams {
                name: nic_name.clone(),
                kind: InterfaceKind::Ethernet,
                phy_address: None,
                ipv4: Vec::new(),
                ipv6: Vec::new(),
                mtu: None,
                rx_mode: model::input::RxMode::Unknown,
            },
            mtu,
        );
        self.store.put(store::keys::interface(&he, &nic_name), Resource::Interface(nic))?;

        let containers: Vec<&SfcElement> = sfc
            .elements
            .iter()
            .filter(|e| e.kind != Some(ElementKind::HostEntity))
            .collect();

        match sfc.sfc_type {
            SfcType::NsNicBd => {
                let bridge_name = format!("bd-ns-nic-{}", sfc.name);
                let defaults = self.system_parameters.dynamic_bridge;
                self.store
                    .reconcile_bridge_domain(store::keys::bridge_domain(&he, &bridge_name), &bridge_name, defaults, &nic_name)?;
                for el in containers {
                    self.attach_element_to_bridge(sfc, el, &he, &bridge_name, defaults)?;
                }
            }
            SfcType::NsNicL2Xconn => {
                for el in containers {
                    let vswitch_if = self.ensure_vswitch_interface(sfc, el, &he)?;
                    for cc in builders::build_cross_connect_pair(nic_name.clone(), vswitch_if) {
                        self.store.put(store::keys::xconnect(&he, &cc.rx_if), Resource::CrossConnect(cc))?;
                    }
                }
            }
            SfcType::NsNicVrf => {
                for el in containers {
                    let vswitch_if = self.ensure_vswitch_interface(sfc, el, &he)?;
                    let weight = self.system_parameters.default_route_weight;
                    let preference = self.system_parameters.default_route_preference;
                    for route in &el.l3vrf_routes {
                        let dst_addr = match route.dst.as_address() {
                            std::net::IpAddr::V4(addr) => addr,
                            std::net::IpAddr::V6(_) => {
                                return Err(ConfigError::InvalidIpAddress(format!(
                                    "{}/{}: IPv6 VRF routes are not supported",
                                    sfc.name, el.container
                                ))
                                .into())
                            }
                        };
                        let description = format!("{}/{}/{}", sfc.name, el.container, el.port_label);
                        let built = builders::build_static_route(
                            0,
                            description,
                            dst_addr,
                            route.dst.length(),
                            &route.next_hop.to_string(),
                            vswitch_if.clone(),
                            weight,
                            preference,
                        )?;
                        self.store.put(store::keys::route(&he, &built.description), Resource::StaticRoute(built))?;
                    }
                    for arp in &el.l3arp_entries {
                        let entry = builders::build_arp_entry(vswitch_if.clone(), arp.ip, arp.mac);
                        self.store.put(store::keys::arp(&he, &vswitch_if, &arp.ip), Resource::ArpEntry(entry))?;
                    }
                }
            }
            _ => {
                return Err(ConfigError::InternalFailure(
                    "wire_ns_nic dispatched for a non-NIC SFC type".to_string(),
                )
                .into())
            }
        }
        Ok(())
    }

    /// East-west, direct inter-container pairing (`SFC_EW_MEMIF`/`SFC_EW_VETH`):
    /// elements pair up in declaration order, each pair sharing one memif or
    /// veth id between its two ends. `vnf_repeat_count` inserts that many
    /// synthetic intermediate hops into every pair, each hop its own fresh id.
    fn wire_ew_memif(&mut self, sfc: &SfcEntity) -> Result<(), EngineError> {
        if sfc.elements.len() % 2 != 0 {
            return Err(ConfigError::OddElementCount(sfc.name.clone(), sfc.elements.len()).into());
        }
        for (pair_index, pair) in sfc.elements.chunks(2).enumerate() {
            let [a, b] = pair else {
                return Err(ConfigError::InternalFailure("chunks(2) on an even-length slice".to_string()).into());
            };
            let chain = self.synthesize_repeat_chain(sfc, a, b, pair_index);
            for (left, right) in chain.iter().zip(chain.iter().skip(1)) {
                self.wire_pair_interfaces(sfc, left, right)?;
            }
        }
        Ok(())
    }

    /// Build the `[a, vnfx-1, .., vnfx-N, b]` chain `vnf_repeat_count`
    /// synthesizes between `a` and `b`. Synthetic hops carry `a`'s switch key
    /// and kind, since the repeat count models fan-out local to one host.
    fn synthesize_repeat_chain(&self, sfc: &SfcEntity, a: &SfcElement, b: &SfcElement, pair_index: usize) -> Vec<SfcElement> {
        let mut chain = vec![a.clone()];
        for hop in 0..sfc.vnf_repeat_count {
            let mut synthetic = a.clone();
            synthetic.container = format!("vnfx-{}-{pair_index}-{hop}", sfc.name);
            synthetic.port_label = "synthetic".to_string();
            synthetic.ipv4 = None;
            synthetic.ipv6 = None;
            synthetic.mac = None;
            chain.push(synthetic);
        }
        chain.push(b.clone());
        chain
    }

    /// Allocate (or reuse) one shared memif/veth id for the `(left, right)`
    /// pair and build both sides' vSwitch-end interfaces.
    fn wire_pair_interfaces(&mut self, sfc: &SfcEntity, left: &SfcElement, right: &SfcElement) -> Result<(), EngineError> {
        let left_key = model::SfcIdKey::new(sfc.name.clone(), left.container.clone(), left.port_label.clone());
        let right_key = model::SfcIdKey::new(sfc.name.clone(), right.container.clone(), right.port_label.clone());
        let (left_addr, left_mac) = self.resolve_element_address(sfc, &left_key, left)?;
        let (right_addr, right_mac) = self.resolve_element_address(sfc, &right_key, right)?;
        let kind = left.kind.ok_or(ConfigError::MissingParameter("element.kind"))?;
        let mtu = self.system_parameters.mtu;

        if kind.is_memif() {
            let memif_id = match self.sfc_ids.get(&left_key).and_then(|b| b.memif_id) {
                Some(id) => id,
                None => {
                    let pair_key = format!(
                        "{}/{}/{}~{}/{}",
                        sfc.name, left.container, left.port_label, right.container, right.port_label
                    );
                    let id = self.memif_ids.allocate(pair_key).map_err(model::errors::AllocationError::from)?;
                    self.sfc_ids.entry(left_key.clone()).memif_id = Some(id);
                    self.sfc_ids.entry(right_key.clone()).memif_id = Some(id);
                    id
                }
            };
            let left_name = format!("memif{}/0", memif_id.as_u32());
            let left_iface = builders::build_interface(
                builders::InterfaceParams {
                    name: left_name.clone(),
                    kind: InterfaceKind::Memif { memif_id: memif_id.as_u32(), is_master: true },
                    phy_address: Some(left_mac),
                    ipv4: left_addr.into_iter().collect(),
                    ipv6: Vec::new(),
                    mtu: left.mtu,
                    rx_mode: left.rx_mode,
                },
                mtu,
            );
            self.store
                .put(store::keys::interface(&left.etcd_vpp_switch_key, &left_name), Resource::Interface(left_iface))?;

            let right_name = format!("memif{}/1", memif_id.as_u32());
            let right_iface = builders::build_interface(
                builders::InterfaceParams {
                    name: right_name.clone(),
                    kind: InterfaceKind::Memif { memif_id: memif_id.as_u32(), is_master: false },
                    phy_address: Some(right_mac),
                    ipv4: right_addr.into_iter().collect(),
                    ipv6: Vec::new(),
                    mtu: right.mtu,
                    rx_mode: right.rx_mode,
                },
                mtu,
            );
            self.store
                .put(store::keys::interface(&right.etcd_vpp_switch_key, &right_name), Resource::Interface(right_iface))?;
        } else {
            let veth_id = match self.sfc_ids.get(&left_key).and_then(|b| b.veth_id) {
                Some(id) => id,
                None => {
                    let pair_key = format!(
                        "{}/{}/{}~{}/{}",
                        sfc.name, left.container, left.port_label, right.container, right.port_label
                    );
                    let id = self.veth_ids.allocate(pair_key).map_err(model::errors::AllocationError::from)?;
                    self.sfc_ids.entry(left_key.clone()).veth_id = Some(id);
                    self.sfc_ids.entry(right_key.clone()).veth_id = Some(id);
                    id
                }
            };
            for (el, mac, addr, is_left) in [(left, left_mac, left_addr, true), (right, right_mac, right_addr, false)] {
                let suffix = if is_left { "a" } else { "b" };
                let veth_name = format!("veth{}-{suffix}", veth_id.as_u32());
                let peer_name = format!("veth{}-{suffix}-peer", veth_id.as_u32());
                let host_if = format!("afpacket{}-{suffix}", veth_id.as_u32());
                let veth = builders::build_linux_veth(
                    builders::LinuxVethParams {
                        name: veth_name.clone(),
                        peer_name,
                        host_if_name: host_if.clone(),
                        container_namespace: el.container.clone(),
                        mac: Some(mac),
                        ipv4: addr.into_iter().collect(),
                        ipv6: Vec::new(),
                        mtu: el.mtu,
                    },
                    mtu,
                );
                self.store
                    .put(store::keys::linux_interface(&el.etcd_vpp_switch_key, &veth_name), Resource::LinuxVeth(veth))?;
                let af_iface = model::resource::Interface {
                    name: host_if.clone(),
                    kind: InterfaceKind::AfPacket { host_if: veth_name },
                    enabled: true,
                    phy_address: None,
                    ipv4: Vec::new(),
                    ipv6: Vec::new(),
                    mtu,
                    rx_mode: builders::translate_rx_mode(el.rx_mode),
                };
                self.store
                    .put(store::keys::interface(&el.etcd_vpp_switch_key, &host_if), Resource::Interface(af_iface))?;
            }
        }
        Ok(())
    }

    /// East-west, joined into a shared bridge (`SFC_EW_BD`/`SFC_EW_BD_L2FIB`/`SFC_EW_VRF`):
    /// each element joins its host's default bridge (dynamic or static,
    /// per `static_bridge`), or a per-SFC override bridge if `bd_parms` is set.
    fn wire_ew_bd(&mut self, sfc: &SfcEntity, static_bridge: bool) -> Result<(), EngineError> {
        for el in &sfc.elements {
            let he = el.etcd_vpp_switch_key.clone();
            self.require_host(&he)?;

            let (bridge_name, defaults) = if let Some(bd_parms) = sfc.bd_parms {
                let bridge_name = match self.cache.sfc_bridge(&sfc.name, &he) {
                    Some(name) => name.to_string(),
                    None => {
                        let name = format!("bd-sfc-{}-{he}", sfc.name);
                        self.cache.set_sfc_bridge(&sfc.name, &he, name.clone());
                        name
                    }
                };
                (bridge_name, bridge_defaults_from(bd_parms))
            } else {
                let bridges = self.cache.host(&he).cloned().ok_or_else(|| ConfigError::NoSuchHost(he.clone()))?;
                if static_bridge {
                    (bridges.static_bridge, self.system_parameters.static_bridge)
                } else {
                    (bridges.dynamic_bridge, self.system_parameters.dynamic_bridge)
                }
            };

            self.attach_element_to_bridge(sfc, el, &he, &bridge_name, defaults)?;
        }
        Ok(())
    }

    /// East-west, L2 cross-connected in declaration order (`SFC_EW_L2XCONN`):
    /// consecutive elements pair up and are cleared from the carry once wired,
    /// so an odd trailing element is simply left unconnected.
    fn wire_ew_l2xconn(&mut self, sfc: &SfcEntity) -> Result<(), EngineError> {
        let mut previous: Option<(String, String)> = None;
        for el in &sfc.elements {
            let he = el.etcd_vpp_switch_key.clone();
            self.require_host(&he)?;
            let vswitch_if = self.ensure_vswitch_interface(sfc, el, &he)?;
            if let Some((prev_he, prev_if)) = previous.take() {
                if prev_he != he {
                    return Err(ConfigError::InternalFailure(format!(
                        "cross-connect pair for SFC '{}' spans hosts '{prev_he}' and '{he}'",
                        sfc.name
                    ))
                    .into());
                }
                for cc in builders::build_cross_connect_pair(prev_if, vswitch_if) {
                    self.store.put(store::keys::xconnect(&he, &cc.rx_if), Resource::CrossConnect(cc))?;
                }
            } else {
                previous = Some((he, vswitch_if));
            }
        }
        Ok(())
    }
}
