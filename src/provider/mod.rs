// Copyright (c) 2025 - Cowboy AI, Inc.
//! Metal Provider Abstraction
//!
//! The provisioning engine does not talk to a cloud API directly. It issues
//! create/attach requests through [`MetalProvider`] and consumes key material,
//! random strings and boot documents through the collaborator traits in
//! [`collaborators`].
//!
//! # Resource Model
//!
//! ```text
//! MetalProvider
//!   ├── create_project_api_key  → ApiKey
//!   ├── create_vlan             → Vlan
//!   ├── reserve_ip_block        → ReservedBlock
//!   ├── create_gateway          → Gateway        (VLAN + block)
//!   ├── create_device           → Device
//!   ├── set_network_type        → NetworkTypeBinding
//!   ├── attach_port             → PortAttachment (after network type)
//!   └── create_ssh_key          → SshKey
//! ```
//!
//! [`RecordingProvider`] is an in-memory implementation that records every
//! request, useful for tests and dry runs.

pub mod collaborators;
pub mod recording;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

use crate::domain::network::{block_size, host};
use crate::domain::{DeviceRole, Hostname, NetworkError, NetworkType, VlanId};

pub use collaborators::{
    DeterministicRandom, KeyAlgorithm, Keypair, KeypairGenerator, KeypairSpec,
    MimeMultipartRenderer, RandomStringGenerator, RandomStringSpec, StaticKeypairGenerator,
    UserDataPart, UserDataRenderer, UuidRandom,
};
pub use recording::{JournalEntry, Phase, ProviderCall, RecordingProvider};

/// Error returned by a provider or collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Request for a project-scoped API key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKeyRequest {
    pub project_id: String,
    pub read_only: bool,
    pub description: String,
}

/// Project API key
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub id: String,
    pub token: String,
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Request for a VLAN in a metro
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanRequest {
    pub project_id: String,
    pub metro: String,
    pub description: String,
}

/// Provisioned VLAN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vlan {
    pub id: String,
    pub vxlan: VlanId,
    pub metro: String,
}

/// Request for a reserved block of public addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpBlockRequest {
    pub project_id: String,
    pub metro: String,
    pub block_type: String,
    pub quantity: u32,
    pub tags: Vec<String>,
}

/// Reserved block of addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedBlock {
    pub id: String,
    pub cidr: Ipv4Net,
    pub quantity: u32,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
}

impl ReservedBlock {
    /// Describe a block from its CIDR; the gateway is host offset 1
    pub fn from_cidr(id: impl Into<String>, cidr: Ipv4Net) -> Result<Self, NetworkError> {
        let cidr = cidr.trunc();
        let quantity = u32::try_from(block_size(&cidr))
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Ok(Self {
            id: id.into(),
            netmask: cidr.netmask(),
            gateway: host(&cidr, 1)?,
            cidr,
            quantity,
        })
    }
}

/// Request for a metal gateway binding a block to a VLAN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayRequest {
    pub project_id: String,
    pub vlan_id: String,
    pub ip_reservation_id: String,
}

/// Metal gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    pub id: String,
    pub vlan_id: String,
    pub ip_reservation_id: String,
}

/// Device creation request
///
/// Workers carry an iPXE script URL; the admin node carries user data and
/// the bootstrap payload as custom data. Neither field is printed by `Debug`
/// since the payload holds key material.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DeviceNode {
    pub role: DeviceRole,
    pub index: u32,
    pub hostname: Hostname,
    pub device_type: String,
    pub metro: String,
    pub project_id: String,
    pub operating_system: String,
    pub billing_cycle: String,
    pub always_pxe: bool,
    pub tags: BTreeSet<String>,
    pub ipxe_script_url: Option<String>,
    pub user_data: Option<String>,
    pub custom_data: Option<String>,
}

impl fmt::Debug for DeviceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceNode")
            .field("role", &self.role)
            .field("index", &self.index)
            .field("hostname", &self.hostname)
            .field("device_type", &self.device_type)
            .field("metro", &self.metro)
            .field("operating_system", &self.operating_system)
            .field("tags", &self.tags)
            .field("ipxe_script_url", &self.ipxe_script_url)
            .field("user_data", &self.user_data.as_ref().map(|_| "<redacted>"))
            .field("custom_data", &self.custom_data.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Created device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub hostname: Hostname,
}

/// Request to switch a device's network mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkTypeRequest {
    pub device_id: String,
    pub network_type: NetworkType,
}

/// Acknowledged network mode of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTypeBinding {
    pub device_id: String,
    pub network_type: NetworkType,
}

/// Request to attach a device port to a VLAN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortAttachmentRequest {
    pub device_id: String,
    pub port_name: String,
    pub vxlan: VlanId,
}

/// Port attached to a VLAN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAttachment {
    pub id: String,
    pub device_id: String,
    pub port_name: String,
    pub vxlan: VlanId,
}

/// Request to register a public key with the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SshKeyRequest {
    pub name: String,
    pub public_key: String,
}

/// Registered SSH key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshKey {
    pub id: String,
    pub name: String,
}

/// Create/attach primitives of a cloud metal provider
#[async_trait]
pub trait MetalProvider: Send + Sync {
    async fn create_project_api_key(&self, request: ApiKeyRequest) -> Result<ApiKey, ProviderError>;

    async fn create_vlan(&self, request: VlanRequest) -> Result<Vlan, ProviderError>;

    /// Reserve a block; the returned value carries the CIDR once it is known
    async fn reserve_ip_block(&self, request: IpBlockRequest)
        -> Result<ReservedBlock, ProviderError>;

    async fn create_gateway(&self, request: GatewayRequest) -> Result<Gateway, ProviderError>;

    async fn create_device(&self, request: DeviceNode) -> Result<Device, ProviderError>;

    async fn set_network_type(
        &self,
        request: NetworkTypeRequest,
    ) -> Result<NetworkTypeBinding, ProviderError>;

    /// Attach a port; callers only issue this once the network type is set
    async fn attach_port(
        &self,
        request: PortAttachmentRequest,
    ) -> Result<PortAttachment, ProviderError>;

    async fn create_ssh_key(&self, request: SshKeyRequest) -> Result<SshKey, ProviderError>;
}
