// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The reconciler (§4.G): one cycle resets derived state, replays the
//! declarative input through the wiring engine, and diffs the resulting
//! "after" snapshot against the "before" one so the store gateway applies
//! only the minimal delta.

use std::collections::BTreeMap;

use cache::Cache;
use model::{ExternalEntity, HostEntity, SfcEntity};
use serde::{Deserialize, Serialize};

use crate::{Engine, EngineError, ExternalDriver};

/// A full cycle's declarative input: every host, external entity, and SFC
/// the operator currently wants wired. This is the document the `controller`
/// binary loads from its config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub hosts: Vec<HostEntity>,
    #[serde(default)]
    pub externals: Vec<ExternalEntity>,
    #[serde(default)]
    pub sfcs: Vec<SfcEntity>,
}

/// What a [`Engine::reconcile`] cycle changed in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub puts: usize,
    pub deletes: usize,
}

impl<D: ExternalDriver> Engine<D> {
    /// Run one reconcile cycle against `desired`: reset the cache and the
    /// declarative registries (but never the persisted id counters, IPAM
    /// state, or system parameters), replay every `WireHost`/
    /// `WireHostToExternal`/`WireSfc` call, then diff the resulting "after"
    /// snapshot against "before" and commit only the minimal delta.
    ///
    /// An SFC that fails to wire is skipped (logged by the caller via the
    /// returned error list), not the whole cycle.
    pub fn reconcile(&mut self, desired: DesiredState) -> Result<(ReconcileReport, Vec<EngineError>), EngineError> {
        self.cache = Cache::new();
        self.hosts.clear();
        self.externals.clear();

        let before = self.store.begin_reconcile()?;

        for he in desired.hosts {
            self.wire_host(he)?;
        }
        for ee in desired.externals {
            self.register_external(ee);
        }

        // Host/external and host/host edges are not in `DesiredState`
        // explicitly; they are materialized lazily by whichever SFC below
        // first needs them, via `ensure_vxlan_and_bridge_to_{ee,he}`.
        let mut errors = Vec::new();
        for sfc in desired.sfcs {
            let name = sfc.name.clone();
            if let Err(err) = self.wire_sfc(sfc) {
                tracing::warn!(sfc = name.as_str(), error = %err, "WireSfc failed, skipping");
                errors.push(err);
            }
        }

        let after = self.store.after_snapshot()?;
        let (deletes, puts) = diff(&before, &after);
        let report = ReconcileReport {
            puts: puts.len(),
            deletes: deletes.len(),
        };
        self.store.commit_reconcile(&deletes, puts)?;
        Ok((report, errors))
    }
}

/// Compute the minimal delta from `before` to `after`: keys present in
/// `before` but absent from `after` are deleted; keys in `after` whose value
/// differs from (or is absent from) `before` are put.
fn diff(
    before: &BTreeMap<String, model::resource::Resource>,
    after: &BTreeMap<String, model::resource::Resource>,
) -> (Vec<String>, Vec<(String, model::resource::Resource)>) {
    let deletes = before
        .keys()
        .filter(|key| !after.contains_key(*key))
        .cloned()
        .collect();
    let puts = after
        .iter()
        .filter(|(key, value)| before.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    (deletes, puts)
}

#[cfg(test)]
mod test {
    use std::net::Ipv4Addr;

    use model::input::{HostEntityBuilder, RxMode};

    use super::*;
    use crate::Engine;

    fn host(name: &str) -> HostEntity {
        HostEntityBuilder::default()
            .name(name)
            .loopback_ipv4(Ipv4Addr::new(10, 255, 0, 1))
            .rx_mode(RxMode::Polling)
            .build()
            .expect("builder invariants hold")
    }

    #[test]
    fn first_cycle_is_all_puts_no_deletes() {
        let mut engine = Engine::new();
        let desired = DesiredState {
            hosts: vec![host("vswitch1")],
            ..DesiredState::default()
        };
        let (report, errors) = engine.reconcile(desired).expect("reconcile");
        assert!(errors.is_empty());
        assert!(report.puts > 0);
        assert_eq!(report.deletes, 0);
    }

    #[test]
    fn idempotent_reapply_produces_zero_diff() {
        let mut engine = Engine::new();
        let desired = || DesiredState {
            hosts: vec![host("vswitch1")],
            ..DesiredState::default()
        };
        engine.reconcile(desired()).expect("first cycle");
        let (report, errors) = engine.reconcile(desired()).expect("second cycle");
        assert!(errors.is_empty());
        assert_eq!(report.puts, 0, "re-applying identical input writes nothing");
        assert_eq!(report.deletes, 0);
    }

    #[test]
    fn removing_a_host_deletes_exactly_its_keys() {
        let mut engine = Engine::new();
        engine
            .reconcile(DesiredState {
                hosts: vec![host("vswitch1"), host("vswitch2")],
                ..DesiredState::default()
            })
            .expect("first cycle");
        let (report, errors) = engine
            .reconcile(DesiredState {
                hosts: vec![host("vswitch1")],
                ..DesiredState::default()
            })
            .expect("second cycle");
        assert!(errors.is_empty());
        assert!(report.deletes >= 3, "vswitch2's loop0 and two bridges are stale");
        assert!(engine
            .store()
            .get("vswitch2/interface/loop0")
            .expect("get")
            .is_none());
        assert!(engine
            .store()
            .get("vswitch1/interface/loop0")
            .expect("get")
            .is_some());
    }
}
