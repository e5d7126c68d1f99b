// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bare-metal Kubernetes cluster provisioning
//!
//! This crate wires the network, identity and compute resources of an
//! admin/worker cluster into a dependency graph and drives their creation
//! against a metal provider. It also partitions the cluster's single reserved
//! address block into fixed-purpose addresses.

pub mod config;
pub mod domain;
pub mod errors;
pub mod frp;
pub mod graph;
pub mod logging;
pub mod provider;
pub mod service;
pub mod state_machine;

// Re-export commonly used types
pub use config::ProvisionerConfig;
pub use domain::{partition, AddressSet, ClusterOutputs, ClusterSpec};
pub use errors::{ProvisionError, ProvisionResult};
pub use frp::{join_all, AsyncValue};
pub use graph::{ProvisionReport, ResourceGraph};
pub use provider::{MetalProvider, RecordingProvider};
pub use service::{ClusterPlan, ClusterProvisioner};
