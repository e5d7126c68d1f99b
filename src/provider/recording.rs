// Copyright (c) 2025 - Cowboy AI, Inc.
//! Recording Provider
//!
//! In-memory [`MetalProvider`] that performs no remote calls. Every request is
//! recorded in order, identifiers and CIDRs are assigned deterministically,
//! and individual resources can be made to fail. Useful for testing the
//! provisioning graph and for dry runs.
//!
//! Requests are identified by the same labels the graph uses for its nodes
//! (`vlan`, `device/data-plane-1`, `port-attachment/admin`, ...).
//!
//! # Example
//!
//! ```rust
//! use metal_cluster::provider::{MetalProvider, RecordingProvider, VlanRequest};
//!
//! # tokio_test::block_on(async {
//! let provider = RecordingProvider::new().reject("vlan");
//! let result = provider
//!     .create_vlan(VlanRequest {
//!         project_id: "p".into(),
//!         metro: "am".into(),
//!         description: "eksa".into(),
//!     })
//!     .await;
//!
//! assert!(result.is_err());
//! assert_eq!(provider.calls().len(), 1);
//! # });
//! ```

use async_trait::async_trait;
use ipnet::Ipv4Net;
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::{
    ApiKey, ApiKeyRequest, Device, DeviceNode, Gateway, GatewayRequest, IpBlockRequest,
    MetalProvider, NetworkTypeBinding, NetworkTypeRequest, PortAttachment, PortAttachmentRequest,
    ProviderError, ReservedBlock, SshKey, SshKeyRequest, Vlan, VlanRequest,
};
use crate::domain::{Hostname, VlanId};

/// First address handed out when no fixed block CIDR is configured
const BLOCK_POOL_START: Ipv4Addr = Ipv4Addr::new(145, 40, 64, 0);

/// First VXLAN id handed out
const VXLAN_START: u16 = 1000;

/// A request received by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    CreateApiKey(ApiKeyRequest),
    CreateVlan(VlanRequest),
    ReserveIpBlock(IpBlockRequest),
    CreateGateway(GatewayRequest),
    CreateDevice(DeviceNode),
    SetNetworkType {
        hostname: Hostname,
        request: NetworkTypeRequest,
    },
    AttachPort {
        hostname: Hostname,
        request: PortAttachmentRequest,
    },
    CreateSshKey(SshKeyRequest),
}

impl ProviderCall {
    /// Resource label of the call
    pub fn label(&self) -> String {
        match self {
            Self::CreateApiKey(_) => "api-key".to_string(),
            Self::CreateVlan(_) => "vlan".to_string(),
            Self::ReserveIpBlock(_) => "reserved-ip-block".to_string(),
            Self::CreateGateway(_) => "gateway".to_string(),
            Self::CreateDevice(node) => format!("device/{}", node.hostname),
            Self::SetNetworkType { hostname, .. } => format!("network-type/{}", hostname),
            Self::AttachPort { hostname, .. } => format!("port-attachment/{}", hostname),
            Self::CreateSshKey(_) => "ssh-key".to_string(),
        }
    }
}

/// Point in the life of a recorded call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Issued,
    Completed,
    Rejected,
}

/// One line of the provider journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub phase: Phase,
    pub label: String,
}

#[derive(Debug, Default)]
struct Ledger {
    calls: Vec<ProviderCall>,
    journal: Vec<JournalEntry>,
    devices: HashMap<String, Hostname>,
    issued_ids: HashMap<&'static str, u64>,
    next_vxlan: u16,
    block_cursor: u32,
}

impl Ledger {
    /// Ids are numbered per kind, so the first key is always `key-0001`
    fn next_id(&mut self, kind: &'static str) -> String {
        let counter = self.issued_ids.entry(kind).or_insert(0);
        *counter += 1;
        format!("{}-{:04}", kind, counter)
    }
}

/// In-memory provider that records every request
#[derive(Debug, Default)]
pub struct RecordingProvider {
    ledger: Mutex<Ledger>,
    rejections: HashSet<String>,
    block_cidr: Option<Ipv4Net>,
    latency: Option<Duration>,
    latency_for: HashMap<String, Duration>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request for the resource with this label
    pub fn reject(mut self, label: impl Into<String>) -> Self {
        self.rejections.insert(label.into());
        self
    }

    /// Answer every block reservation with this CIDR
    pub fn with_block_cidr(mut self, cidr: Ipv4Net) -> Self {
        self.block_cidr = Some(cidr.trunc());
        self
    }

    /// Delay every answer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delay answers for one resource label, overriding the global latency
    pub fn with_latency_for(mut self, label: impl Into<String>, latency: Duration) -> Self {
        self.latency_for.insert(label.into(), latency);
        self
    }

    /// All requests in the order they were issued
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.ledger().calls.clone()
    }

    /// Issued/completed/rejected entries in the order they happened
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.ledger().journal.clone()
    }

    /// Device requests in the order they were issued
    pub fn device_requests(&self) -> Vec<DeviceNode> {
        self.ledger()
            .calls
            .iter()
            .filter_map(|call| match call {
                ProviderCall::CreateDevice(node) => Some(node.clone()),
                _ => None,
            })
            .collect()
    }

    /// Index of the first journal entry matching `phase` and `label`
    pub fn position(&self, phase: Phase, label: &str) -> Option<usize> {
        self.ledger()
            .journal
            .iter()
            .position(|entry| entry.phase == phase && entry.label == label)
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hostname_of(&self, device_id: &str) -> Result<Hostname, ProviderError> {
        self.ledger()
            .devices
            .get(device_id)
            .cloned()
            .ok_or_else(|| ProviderError::new(format!("unknown device {}", device_id)))
    }

    /// Record `call`, wait out its latency, then answer with `respond`
    async fn handle<T, F>(&self, call: ProviderCall, respond: F) -> Result<T, ProviderError>
    where
        T: Send,
        F: FnOnce(&mut Ledger) -> Result<T, ProviderError> + Send,
    {
        let label = call.label();
        debug!(resource = %label, "Provider request");
        {
            let mut ledger = self.ledger();
            ledger.journal.push(JournalEntry {
                phase: Phase::Issued,
                label: label.clone(),
            });
            ledger.calls.push(call);
        }

        if let Some(latency) = self.latency_for.get(&label).copied().or(self.latency) {
            tokio::time::sleep(latency).await;
        }

        let mut ledger = self.ledger();
        let result = if self.rejections.contains(&label) {
            Err(ProviderError::new(format!("{} rejected by provider", label)))
        } else {
            respond(&mut ledger)
        };

        let phase = if result.is_ok() {
            Phase::Completed
        } else {
            Phase::Rejected
        };
        ledger.journal.push(JournalEntry { phase, label });
        result
    }

    fn allocate_block(&self, ledger: &mut Ledger, quantity: u32) -> Result<Ipv4Net, ProviderError> {
        if let Some(cidr) = self.block_cidr {
            return Ok(cidr);
        }
        if quantity == 0 || !quantity.is_power_of_two() {
            return Err(ProviderError::new(format!(
                "quantity {} is not a power of two",
                quantity
            )));
        }

        let prefix = 32 - quantity.trailing_zeros() as u8;
        let base = u32::from(BLOCK_POOL_START)
            .checked_add(ledger.block_cursor)
            .ok_or_else(|| ProviderError::new("address pool exhausted"))?;
        ledger.block_cursor = ledger.block_cursor.saturating_add(quantity);

        Ipv4Net::new(Ipv4Addr::from(base), prefix)
            .map(|net| net.trunc())
            .map_err(|e| ProviderError::new(e.to_string()))
    }
}

#[async_trait]
impl MetalProvider for RecordingProvider {
    async fn create_project_api_key(&self, request: ApiKeyRequest) -> Result<ApiKey, ProviderError> {
        self.handle(ProviderCall::CreateApiKey(request), |ledger| {
            let id = ledger.next_id("key");
            Ok(ApiKey {
                token: format!("token-{}", id),
                id,
            })
        })
        .await
    }

    async fn create_vlan(&self, request: VlanRequest) -> Result<Vlan, ProviderError> {
        let metro = request.metro.clone();
        self.handle(ProviderCall::CreateVlan(request), move |ledger| {
            let next = VXLAN_START
                .checked_add(ledger.next_vxlan)
                .ok_or_else(|| ProviderError::new("VXLAN ids exhausted"))?;
            let vxlan = VlanId::new(next).map_err(|e| ProviderError::new(e.to_string()))?;
            ledger.next_vxlan = ledger
                .next_vxlan
                .checked_add(1)
                .ok_or_else(|| ProviderError::new("VXLAN ids exhausted"))?;
            Ok(Vlan {
                id: ledger.next_id("vlan"),
                vxlan,
                metro,
            })
        })
        .await
    }

    async fn reserve_ip_block(
        &self,
        request: IpBlockRequest,
    ) -> Result<ReservedBlock, ProviderError> {
        let quantity = request.quantity;
        self.handle(ProviderCall::ReserveIpBlock(request), move |ledger| {
            let cidr = self.allocate_block(ledger, quantity)?;
            ReservedBlock::from_cidr(ledger.next_id("block"), cidr)
                .map_err(|e| ProviderError::new(e.to_string()))
        })
        .await
    }

    async fn create_gateway(&self, request: GatewayRequest) -> Result<Gateway, ProviderError> {
        let vlan_id = request.vlan_id.clone();
        let ip_reservation_id = request.ip_reservation_id.clone();
        self.handle(ProviderCall::CreateGateway(request), move |ledger| {
            Ok(Gateway {
                id: ledger.next_id("gateway"),
                vlan_id,
                ip_reservation_id,
            })
        })
        .await
    }

    async fn create_device(&self, request: DeviceNode) -> Result<Device, ProviderError> {
        let hostname = request.hostname.clone();
        self.handle(ProviderCall::CreateDevice(request), move |ledger| {
            let id = ledger.next_id("device");
            ledger.devices.insert(id.clone(), hostname.clone());
            Ok(Device { id, hostname })
        })
        .await
    }

    async fn set_network_type(
        &self,
        request: NetworkTypeRequest,
    ) -> Result<NetworkTypeBinding, ProviderError> {
        let hostname = self.hostname_of(&request.device_id)?;
        let binding = NetworkTypeBinding {
            device_id: request.device_id.clone(),
            network_type: request.network_type,
        };
        self.handle(ProviderCall::SetNetworkType { hostname, request }, move |_| Ok(binding))
            .await
    }

    async fn attach_port(
        &self,
        request: PortAttachmentRequest,
    ) -> Result<PortAttachment, ProviderError> {
        let hostname = self.hostname_of(&request.device_id)?;
        let device_id = request.device_id.clone();
        let port_name = request.port_name.clone();
        let vxlan = request.vxlan;
        self.handle(ProviderCall::AttachPort { hostname, request }, move |ledger| {
            Ok(PortAttachment {
                id: ledger.next_id("port"),
                device_id,
                port_name,
                vxlan,
            })
        })
        .await
    }

    async fn create_ssh_key(&self, request: SshKeyRequest) -> Result<SshKey, ProviderError> {
        let name = request.name.clone();
        self.handle(ProviderCall::CreateSshKey(request), move |ledger| {
            Ok(SshKey {
                id: ledger.next_id("ssh-key"),
                name,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::network::parse_block;
    use crate::domain::{DeviceRole, NetworkType};
    use std::collections::BTreeSet;

    fn device(hostname: &str) -> DeviceNode {
        DeviceNode {
            role: DeviceRole::DataPlane,
            index: 1,
            hostname: Hostname::new(hostname).unwrap(),
            device_type: "c3.small.x86".to_string(),
            metro: "am".to_string(),
            project_id: "p".to_string(),
            operating_system: "custom_ipxe".to_string(),
            billing_cycle: "hourly".to_string(),
            always_pxe: true,
            tags: BTreeSet::new(),
            ipxe_script_url: Some("http://10.0.0.2/ipxe/".to_string()),
            user_data: None,
            custom_data: None,
        }
    }

    fn block_request(quantity: u32) -> IpBlockRequest {
        IpBlockRequest {
            project_id: "p".to_string(),
            metro: "am".to_string(),
            block_type: "public_ipv4".to_string(),
            quantity,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn test_blocks_are_aligned_and_disjoint() {
        let provider = RecordingProvider::new();
        let first = provider.reserve_ip_block(block_request(16)).await.unwrap();
        let second = provider.reserve_ip_block(block_request(16)).await.unwrap();

        assert_eq!(first.cidr.to_string(), "145.40.64.0/28");
        assert_eq!(second.cidr.to_string(), "145.40.64.16/28");
        assert_eq!(first.gateway, Ipv4Addr::new(145, 40, 64, 1));
    }

    #[tokio::test]
    async fn test_fixed_block_cidr() {
        let provider =
            RecordingProvider::new().with_block_cidr(parse_block("10.0.0.0/28").unwrap());
        let block = provider.reserve_ip_block(block_request(16)).await.unwrap();
        assert_eq!(block.cidr.to_string(), "10.0.0.0/28");
        assert_eq!(block.quantity, 16);
    }

    #[tokio::test]
    async fn test_network_type_labels_use_hostname() {
        let provider = RecordingProvider::new();
        let created = provider.create_device(device("data-plane-1")).await.unwrap();
        provider
            .set_network_type(NetworkTypeRequest {
                device_id: created.id.clone(),
                network_type: NetworkType::Layer2Individual,
            })
            .await
            .unwrap();

        let labels: Vec<String> = provider.calls().iter().map(ProviderCall::label).collect();
        assert_eq!(labels, vec!["device/data-plane-1", "network-type/data-plane-1"]);
        assert!(
            provider.position(Phase::Completed, "device/data-plane-1").unwrap()
                < provider.position(Phase::Issued, "network-type/data-plane-1").unwrap()
        );
    }

    #[tokio::test]
    async fn test_rejection_is_journaled() {
        let provider = RecordingProvider::new().reject("device/data-plane-1");
        let err = provider.create_device(device("data-plane-1")).await.unwrap_err();

        assert!(err.message.contains("device/data-plane-1"));
        assert!(provider.position(Phase::Rejected, "device/data-plane-1").is_some());
        assert!(provider.position(Phase::Completed, "device/data-plane-1").is_none());
    }

    fn vlan_request() -> VlanRequest {
        VlanRequest {
            project_id: "p".to_string(),
            metro: "am".to_string(),
            description: "EKSA cluster rawkode".to_string(),
        }
    }

    #[tokio::test]
    async fn test_vxlan_ids_are_sequential() {
        let provider = RecordingProvider::new();
        let first = provider.create_vlan(vlan_request()).await.unwrap();
        let second = provider.create_vlan(vlan_request()).await.unwrap();

        assert_eq!(first.vxlan.value(), 1000);
        assert_eq!(second.vxlan.value(), 1001);
        assert_eq!(second.id, "vlan-0002");
    }

    #[tokio::test]
    async fn test_exhausted_vxlan_ids_are_rejected() {
        let provider = RecordingProvider::new();
        provider.ledger().next_vxlan = u16::MAX;

        let err = provider.create_vlan(vlan_request()).await.unwrap_err();
        assert!(err.message.contains("exhausted"));
        assert!(provider.position(Phase::Rejected, "vlan").is_some());
    }

    #[tokio::test]
    async fn test_unknown_device_is_rejected() {
        let provider = RecordingProvider::new();
        let result = provider
            .attach_port(PortAttachmentRequest {
                device_id: "device-9999".to_string(),
                port_name: "eth0".to_string(),
                vxlan: VlanId::new(1000).unwrap(),
            })
            .await;
        assert!(result.is_err());
        assert!(provider.calls().is_empty());
    }
}
