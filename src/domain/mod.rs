// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cluster Domain Models
//!
//! Pure value objects and functions with no I/O: the cluster specification,
//! device hostnames, network value objects, reserved-block partitioning and
//! the invariants checked before anything reaches the provider.
//!
//! # Value Objects with Invariants
//!
//! - [`Hostname`] - RFC 1123 device hostnames
//! - [`VlanId`] - IEEE 802.1Q VLAN ID (1-4094)
//! - [`NetworkType`] - device network mode
//! - [`AddressSet`] - named addresses carved out of the reserved block
//!
//! # Entities
//!
//! - [`ClusterSpec`] - the declarative cluster input
//! - [`ClusterOutputs`] - the only state observable after provisioning

pub mod addressing;
pub mod cluster;
pub mod hostname;
pub mod invariants;
pub mod network;

pub use addressing::{partition, AddressSet};
pub use cluster::{ClusterOutputs, ClusterSpec, DeviceRole, PoolSpec};
pub use hostname::{Hostname, HostnameError};
pub use invariants::{ValidationError, ValidationResult};
pub use network::{NetworkError, NetworkType, VlanId};
