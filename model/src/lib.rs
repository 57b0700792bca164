// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The SFC controller's data model: the declarative input entities operators
//! supply (`input`), the SFC chain description (`sfc`), the derived resource
//! records the engine writes to the store (`resource`), the persisted ID
//! binding namespaces (`bindings`), and the error taxonomy (`errors`).

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::module_name_repetitions)]

pub mod bindings;
pub mod errors;
pub mod input;
pub mod resource;
pub mod sfc;

pub use bindings::{MacInstanceBindings, SFCIDs, SfcIdKey, VlanBindings};
pub use errors::{AllocationError, BuilderError, ConfigError, StoreError};
pub use input::{ExternalEntity, HostEntity, RxMode, SystemParameters};
pub use sfc::{ElementKind, SfcElement, SfcEntity, SfcType};
