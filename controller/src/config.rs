// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config loading (§7): the controller's entire runtime configuration is one
//! YAML document combining [`SystemParameters`] with the declarative input
//! the reconciler replays each cycle.

use std::path::Path;

use engine::DesiredState;
use model::input::SystemParameters;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures loading or parsing a config document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

/// The controller's whole runtime config: `system_parameters` seeds the
/// engine once at startup; the rest is replayed into [`engine::Engine::reconcile`]
/// every cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_parameters: SystemParameters,
    #[serde(flatten)]
    pub desired: DesiredState,
}

/// Load and parse `path` as a [`Config`] document.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml_ng::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_document_parses_with_defaults() {
        let yaml = "hosts: []\nexternals: []\nsfcs: []\n";
        let config: Config = serde_yaml_ng::from_str(yaml).expect("parse");
        assert_eq!(config.system_parameters.starting_vlan_id, 5000);
        assert!(config.desired.hosts.is_empty());
    }

    #[test]
    fn system_parameters_may_be_overridden() {
        let yaml = "system_parameters:\n  mtu: 9000\n  starting_vlan_id: 6000\n  default_route_weight: 5\n  default_route_preference: 0\n  dynamic_bridge: { flood: true, uu_flood: true, forward: true, learn: true, arp_term: false, mac_age: 0 }\n  static_bridge: { flood: false, uu_flood: false, forward: true, learn: false, arp_term: false, mac_age: 0 }\nhosts: []\nexternals: []\nsfcs: []\n";
        let config: Config = serde_yaml_ng::from_str(yaml).expect("parse");
        assert_eq!(config.system_parameters.mtu, 9000);
        assert_eq!(config.system_parameters.starting_vlan_id, 6000);
    }
}
