// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Services
//!
//! The services register nodes into a [`ResourceGraph`](crate::graph::ResourceGraph);
//! none of them calls the provider directly at registration time.
//!
//! ```text
//! ClusterSpec
//!     ↓
//! ClusterProvisioner::plan ─► identity + network nodes
//!     ↓
//! DevicePoolProvisioner    ─► device / network-type / port nodes per worker
//!     ↓
//! AdminBootstrapAssembler  ─► bootstrap payload for the admin device
//!     ↓
//! ClusterPlan::realize     ─► ClusterOutputs
//! ```

pub mod bootstrap;
pub mod cluster;
pub mod pool;

pub use bootstrap::{AdminBootstrapAssembler, AdminBootstrapPayload, BootstrapInputs};
pub use cluster::{ClusterPlan, ClusterProvisioner};
pub use pool::{attach_to_vlan, DevicePoolProvisioner, ProvisionedDevice};
