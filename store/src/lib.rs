// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The store gateway (§4.F): writes derived resources to the backing
//! key-value store under per-switch keys (§6), and buffers writes into an
//! "after" set while the reconciler is running a cycle.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::module_name_repetitions)]

mod gateway;
pub mod keys;

pub use gateway::StoreGateway;
