// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IP-version-neutral network prefix type, used to represent subnets and to
//! compute subnet capacity for address allocation.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::similar_names)]

pub mod prefix;
