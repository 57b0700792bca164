// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The external-entity driver contract (§6): `WireExternalToHost`, called
//! once per (ee, he) edge the first time a VXLAN bridge to that ee is
//! created, so the physical router can be reconfigured.

use tracing::info;

use crate::EngineError;

/// A handle to the physical router's own management plane. The core holds
/// only this handle, never the driver's internals (§9 design notes).
pub trait ExternalDriver: std::fmt::Debug {
    /// Push the newly-created VXLAN edge to the external entity `ee`.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver could not reach or reconfigure `ee`.
    fn wire_external_to_host(
        &mut self,
        ee: &str,
        he: &str,
        vni: u32,
        route_description: Option<&str>,
    ) -> Result<(), EngineError>;
}

/// A driver that only logs. Used by tests and by the `controller` binary
/// until a real driver (SSH, NETCONF, gRPC — whatever `ee.driver_type`
/// names) is plugged in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExternalDriver;

impl ExternalDriver for LoggingExternalDriver {
    fn wire_external_to_host(
        &mut self,
        ee: &str,
        he: &str,
        vni: u32,
        route_description: Option<&str>,
    ) -> Result<(), EngineError> {
        info!(ee, he, vni, route_description, "WireExternalToHost");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn logging_driver_never_fails() {
        let mut driver = LoggingExternalDriver;
        assert!(driver.wire_external_to_host("router1", "vswitch1", 5000, None).is_ok());
    }
}
