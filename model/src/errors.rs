// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Error taxonomy (§7): every fallible crate downstream of `model` wraps its
//! own variant into [`ConfigError`], the union of reasons a declarative input
//! can be rejected before it ever reaches the wiring engine.

use lpm::prefix::Prefix;
use net::eth::mac::Mac;
use thiserror::Error;

/// The reasons an SFC, host or external entity may be rejected as malformed.
///
/// These are all "ConfigError" in §7 terms: dangling references, wrong
/// element counts, multiple external entities in a single NS chain, invalid
/// IP formats. Surfaced to the caller; the offending SFC is skipped, not the
/// whole cycle.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("dangling reference to host entity '{0}'")]
    NoSuchHost(String),
    #[error("dangling reference to external entity '{0}'")]
    NoSuchExternalEntity(String),
    #[error("SFC '{0}' references more than one external entity")]
    TooManyExternalEntities(String),
    #[error("SFC '{0}' references more than one destination host")]
    TooManyDestinationHosts(String),
    #[error("north-south chain '{0}' has neither an external entity nor a destination host")]
    NoDestination(String),
    #[error("east-west memif chain '{0}' has an odd element count ({1})")]
    OddElementCount(String, usize),
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),
    #[error("element address {0} is outside of chain prefix {1}")]
    AddressOutsideChainPrefix(Mac, Prefix),
    #[error("missing mandatory parameter: {0}")]
    MissingParameter(&'static str),
    #[error("internal error: {0}")]
    InternalFailure(String),
}

/// ID counter wrap or IPAM exhaustion (§7 `AllocationError`). Surfaced;
/// reconciliation may retry once the operator corrects the input.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum AllocationError {
    #[error(transparent)]
    Counter(#[from] id::AllocationError),
    #[error(transparent)]
    Ipam(#[from] ipam::IpamError),
}

/// Put/get failure against the backing store (§7 `StoreError`). Surfaced; the
/// reconcile cycle aborts and the next cycle retries.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("store put failed for key '{0}': {1}")]
    PutFailed(String, String),
    #[error("store get failed for key '{0}': {1}")]
    GetFailed(String, String),
}

/// Internal builder invariant violation (§7 `BuilderError`). Should not occur;
/// fatal for the cycle.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BuilderError {
    #[error("builder invariant violated: {0}")]
    InvariantViolation(String),
}
