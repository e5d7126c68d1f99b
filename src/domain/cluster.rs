// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cluster Specification and Outputs
//!
//! [`ClusterSpec`] is the declarative input: a name, a project, a metro and two
//! homogeneous worker pools. [`ClusterOutputs`] is everything a caller can
//! observe once the cluster has been realized.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{ProvisionError, ProvisionResult};

/// Default plan for control-plane and data-plane devices
pub const DEFAULT_DEVICE_TYPE: &str = "c3.small.x86";

/// Role a device plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceRole {
    ControlPlane,
    DataPlane,
    Admin,
}

impl DeviceRole {
    /// Canonical name, also used as hostname prefix and device tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ControlPlane => "control-plane",
            Self::DataPlane => "data-plane",
            Self::Admin => "admin",
        }
    }

    /// Whether devices in this role boot from the admin node over iPXE
    pub fn is_worker(&self) -> bool {
        !matches!(self, Self::Admin)
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative cluster specification
///
/// Immutable once accepted by the provisioner.
///
/// # Examples
///
/// ```rust
/// use metal_cluster::domain::ClusterSpec;
///
/// let spec = ClusterSpec::new("rawkode", "f4db0408-fa3d-44b4-9547-7a1f15c6d132", "am")
///     .with_control_plane(1, "c3.medium.x86")
///     .with_data_plane(2, "c3.small.x86");
///
/// assert_eq!(spec.worker_count(), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub cluster_name: String,
    pub project_id: String,
    pub metro: String,

    #[serde(default)]
    pub control_plane_count: u32,
    #[serde(default = "default_device_type")]
    pub control_plane_device_type: String,

    #[serde(default)]
    pub data_plane_count: u32,
    #[serde(default = "default_device_type")]
    pub data_plane_device_type: String,
}

fn default_device_type() -> String {
    DEFAULT_DEVICE_TYPE.to_string()
}

impl ClusterSpec {
    /// Create a spec with empty pools and default device types
    pub fn new(
        cluster_name: impl Into<String>,
        project_id: impl Into<String>,
        metro: impl Into<String>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            project_id: project_id.into(),
            metro: metro.into(),
            control_plane_count: 0,
            control_plane_device_type: default_device_type(),
            data_plane_count: 0,
            data_plane_device_type: default_device_type(),
        }
    }

    pub fn with_control_plane(mut self, count: u32, device_type: impl Into<String>) -> Self {
        self.control_plane_count = count;
        self.control_plane_device_type = device_type.into();
        self
    }

    pub fn with_data_plane(mut self, count: u32, device_type: impl Into<String>) -> Self {
        self.data_plane_count = count;
        self.data_plane_device_type = device_type.into();
        self
    }

    /// Parse a spec from its JSON document form
    pub fn from_json(document: &str) -> ProvisionResult<Self> {
        serde_json::from_str(document)
            .map_err(|e| ProvisionError::Configuration(format!("invalid cluster spec: {}", e)))
    }

    /// Total number of worker devices across both pools
    ///
    /// `None` when the two counts do not fit in a `u32` together.
    pub fn worker_count(&self) -> Option<u32> {
        self.control_plane_count.checked_add(self.data_plane_count)
    }

    /// Worker pools in address order: control plane first, then data plane
    pub fn pools(&self) -> [PoolSpec; 2] {
        [
            PoolSpec {
                role: DeviceRole::ControlPlane,
                count: self.control_plane_count,
                device_type: self.control_plane_device_type.clone(),
            },
            PoolSpec {
                role: DeviceRole::DataPlane,
                count: self.data_plane_count,
                device_type: self.data_plane_device_type.clone(),
            },
        ]
    }
}

/// One homogeneous worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSpec {
    pub role: DeviceRole,
    pub count: u32,
    pub device_type: String,
}

/// Durable outputs of a realized cluster
///
/// The private key is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOutputs {
    pub admin_ip: String,
    pub private_ssh_key: String,
}

impl fmt::Debug for ClusterOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterOutputs")
            .field("admin_ip", &self.admin_ip)
            .field("private_ssh_key", &"<redacted>")
            .finish()
    }
}
