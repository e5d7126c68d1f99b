// Copyright (c) 2025 - Cowboy AI, Inc.
//! Functional Reactive Abstractions for Provisioning
//!
//! Provisioning is data flow over values that do not exist yet: a device's
//! iPXE URL depends on the admin address, which depends on the CIDR of a block
//! the provider has not reserved yet. This module models such values
//! explicitly so every dependency edge and failure path can be inspected and
//! tested.
//!
//! # Core Concepts
//!
//! ## AsyncValue<T>
//!
//! A write-once value that resolves after a remote side effect completes.
//!
//! ```text
//! Time:   ──────────────────────────────→
//! Value:  ░░░░░░░░░░░░░░●━━━━━━━━━━━━━━━
//!                       resolved once, read many times
//! ```
//!
//! ## Composition
//!
//! - [`AsyncValue::map`] / [`AsyncValue::try_map`] - derive one value from another
//! - [`join_all`] - wait for several values of different types
//! - [`join_vec`] - wait for a list of values of one type
//!
//! Failures propagate through every derivation unchanged; no derivation is
//! ever evaluated on a failed input.
//!
//! # Usage
//!
//! ```rust,ignore
//! use metal_cluster::frp::*;
//!
//! let block: AsyncValue<ReservedBlock> = ...;
//! let addresses = block.try_map(move |b| partition(&b.cidr, b.quantity, workers));
//! let ipxe_url = addresses.map(|a| format!("http://{}/ipxe/", a.admin_ip));
//! ```

pub mod async_value;
pub mod combinators;

pub use async_value::{AsyncValue, Resolver};
pub use combinators::{join_all, join_vec, JoinAll};
