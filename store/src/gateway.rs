// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The store gateway (§4.F): a single `Put` operation backed either by the
//! live store directly, or — while a reconcile cycle is in progress — by an
//! in-memory "after" buffer the reconciler diffs against a "before"
//! snapshot once wiring finishes.

use std::collections::BTreeMap;
use std::sync::Mutex;

use model::errors::StoreError;
use model::resource::{BridgeDomain, Resource};
use tracing::trace;

/// A key/value sink a [`StoreGateway`] writes through to. The live backend
/// and the reconcile-mode buffer both implement it; the gateway itself
/// never depends on which one is active.
trait Sink: Send {
    fn put(&mut self, key: String, resource: Resource);
    fn delete(&mut self, key: &str);
    fn get(&self, key: &str) -> Option<&Resource>;
    fn snapshot(&self) -> BTreeMap<String, Resource>;
}

#[derive(Default)]
struct MapSink(BTreeMap<String, Resource>);

impl Sink for MapSink {
    fn put(&mut self, key: String, resource: Resource) {
        self.0.insert(key, resource);
    }

    fn delete(&mut self, key: &str) {
        self.0.remove(key);
    }

    fn get(&self, key: &str) -> Option<&Resource> {
        self.0.get(key)
    }

    fn snapshot(&self) -> BTreeMap<String, Resource> {
        self.0.clone()
    }
}

/// The store gateway: one live map standing in for the replicated KV store
/// named in §1, plus an optional buffer that, while present, receives every
/// write instead.
pub struct StoreGateway {
    live: Mutex<MapSink>,
    buffer: Mutex<Option<MapSink>>,
}

impl Default for StoreGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreGateway {
    /// An empty gateway, not in reconcile mode.
    #[must_use]
    pub fn new() -> Self {
        StoreGateway {
            live: Mutex::new(MapSink::default()),
            buffer: Mutex::new(None),
        }
    }

    /// Write `resource` under `key`: into the buffer if reconciliation is in
    /// progress, straight to the live store otherwise.
    #[allow(clippy::significant_drop_tightening)]
    pub fn put(&self, key: impl Into<String>, resource: Resource) -> Result<(), StoreError> {
        let key = key.into();
        let mut buffer = self.buffer.lock().map_err(|_| lock_poisoned(&key))?;
        if let Some(sink) = buffer.as_mut() {
            trace!(key, "buffered put");
            sink.put(key, resource);
        } else {
            let mut live = self.live.lock().map_err(|_| lock_poisoned(&key))?;
            trace!(key, "live put");
            live.put(key, resource);
        }
        Ok(())
    }

    /// Merge `member` into the bridge domain at `key`, creating it with
    /// `defaults` if absent. Bridges accumulate members across calls within
    /// one reconcile cycle rather than each call overwriting the last.
    pub fn reconcile_bridge_domain(
        &self,
        key: impl Into<String>,
        bridge_name: &str,
        defaults: model::input::BridgeDomainDefaults,
        member: &str,
    ) -> Result<(), StoreError> {
        let key = key.into();
        let mut buffer = self.buffer.lock().map_err(|_| lock_poisoned(&key))?;
        match buffer.as_mut() {
            Some(sink) => merge_bridge_member(sink, key, bridge_name, defaults, member),
            None => {
                drop(buffer);
                let mut live = self.live.lock().map_err(|_| lock_poisoned(&key))?;
                merge_bridge_member(&mut *live, key, bridge_name, defaults, member);
            }
        }
        Ok(())
    }

    /// Read `key` from whichever sink is currently active.
    pub fn get(&self, key: &str) -> Result<Option<Resource>, StoreError> {
        let buffer = self.buffer.lock().map_err(|_| lock_poisoned(key))?;
        if let Some(sink) = buffer.as_ref() {
            return Ok(sink.get(key).cloned());
        }
        drop(buffer);
        let live = self.live.lock().map_err(|_| lock_poisoned(key))?;
        Ok(live.get(key).cloned())
    }

    /// Snapshot the live store as "before" and install an empty "after"
    /// buffer; every `put`/`reconcile_*` call until [`Self::commit_reconcile`]
    /// writes into that buffer instead of the live store.
    pub fn begin_reconcile(&self) -> Result<BTreeMap<String, Resource>, StoreError> {
        let live = self
            .live
            .lock()
            .map_err(|_| lock_poisoned("begin_reconcile"))?;
        let before = live.snapshot();
        drop(live);
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| lock_poisoned("begin_reconcile"))?;
        *buffer = Some(MapSink::default());
        Ok(before)
    }

    /// The buffer's current contents ("after"), without ending reconcile mode.
    pub fn after_snapshot(&self) -> Result<BTreeMap<String, Resource>, StoreError> {
        let buffer = self
            .buffer
            .lock()
            .map_err(|_| lock_poisoned("after_snapshot"))?;
        Ok(buffer
            .as_ref()
            .map(Sink::snapshot)
            .unwrap_or_default())
    }

    /// Snapshot the live store's current contents, independent of whether a
    /// reconcile cycle is in progress. Used by callers that need to persist
    /// or inspect published state without affecting the buffer.
    pub fn live_snapshot(&self) -> Result<BTreeMap<String, Resource>, StoreError> {
        let live = self.live.lock().map_err(|_| lock_poisoned("live_snapshot"))?;
        Ok(live.snapshot())
    }

    /// Apply the reconciler's computed diff to the live store and drop the
    /// buffer, ending reconcile mode.
    pub fn commit_reconcile(
        &self,
        deletes: &[String],
        puts: Vec<(String, Resource)>,
    ) -> Result<(), StoreError> {
        let mut live = self
            .live
            .lock()
            .map_err(|_| lock_poisoned("commit_reconcile"))?;
        for key in deletes {
            trace!(key, "reconcile delete");
            live.delete(key);
        }
        for (key, resource) in puts {
            trace!(key = key.as_str(), "reconcile put");
            live.put(key, resource);
        }
        drop(live);
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| lock_poisoned("commit_reconcile"))?;
        *buffer = None;
        Ok(())
    }
}

fn merge_bridge_member(
    sink: &mut dyn Sink,
    key: String,
    bridge_name: &str,
    defaults: model::input::BridgeDomainDefaults,
    member: &str,
) {
    let mut bd = match sink.get(&key) {
        Some(Resource::BridgeDomain(bd)) => bd.clone(),
        _ => BridgeDomain::new(bridge_name, defaults),
    };
    bd.add_member(member);
    sink.put(key, Resource::BridgeDomain(bd));
}

fn lock_poisoned(key: &str) -> StoreError {
    StoreError::PutFailed(key.to_string(), "store lock poisoned".to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use model::resource::{Interface, InterfaceKind};

    fn interface(name: &str) -> Resource {
        Resource::Interface(Interface {
            name: name.to_string(),
            kind: InterfaceKind::Loopback,
            enabled: true,
            phy_address: None,
            ipv4: Vec::new(),
            ipv6: Vec::new(),
            mtu: 1500,
            rx_mode: model::input::RxMode::Unknown,
        })
    }

    #[test]
    fn put_outside_reconcile_writes_straight_to_live() {
        let gw = StoreGateway::new();
        gw.put("vswitch1/interface/loop0", interface("loop0")).expect("put");
        assert!(gw.get("vswitch1/interface/loop0").expect("get").is_some());
    }

    #[test]
    fn put_during_reconcile_is_buffered_not_applied() {
        let gw = StoreGateway::new();
        gw.begin_reconcile().expect("begin");
        gw.put("vswitch1/interface/loop0", interface("loop0")).expect("put");
        assert_eq!(
            gw.after_snapshot().expect("after").len(),
            1,
            "buffered write is visible via after_snapshot"
        );
        gw.commit_reconcile(&[], Vec::new()).expect("commit with no diff");
        assert!(
            gw.get("vswitch1/interface/loop0").expect("get").is_none(),
            "buffered write was discarded, not diffed into live"
        );
    }

    #[test]
    fn bridge_domain_accumulates_members_across_calls() {
        let gw = StoreGateway::new();
        let defaults = model::input::BridgeDomainDefaults::dynamic();
        gw.reconcile_bridge_domain("vswitch1/bridge-domain/bd0", "bd0", defaults, "vxlan0")
            .expect("first member");
        gw.reconcile_bridge_domain("vswitch1/bridge-domain/bd0", "bd0", defaults, "memif0")
            .expect("second member");
        match gw.get("vswitch1/bridge-domain/bd0").expect("get").expect("present") {
            Resource::BridgeDomain(bd) => {
                assert_eq!(bd.members(), &["memif0".to_string(), "vxlan0".to_string()]);
            }
            _ => unreachable!("put a bridge domain"),
        }
    }

    #[test]
    fn commit_reconcile_deletes_stale_keys_and_applies_diff() {
        let gw = StoreGateway::new();
        gw.put("vswitch1/interface/stale", interface("stale")).expect("seed");
        gw.begin_reconcile().expect("begin");
        gw.put("vswitch1/interface/fresh", interface("fresh")).expect("put");
        gw.commit_reconcile(
            &["vswitch1/interface/stale".to_string()],
            vec![("vswitch1/interface/fresh".to_string(), interface("fresh"))],
        )
        .expect("commit");
        assert!(gw.get("vswitch1/interface/stale").expect("get").is_none());
        assert!(gw.get("vswitch1/interface/fresh").expect("get").is_some());
    }
}
