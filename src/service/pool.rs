// Copyright (c) 2025 - Cowboy AI, Inc.
//! Device Pool Provisioning
//!
//! A pool is `count` identical devices of one role. Each member follows the
//! same recipe:
//!
//! ```text
//! device/{role}-{i} ──► network-type/{role}-{i} ──► port-attachment/{role}-{i}
//!        ▲                                                  ▲
//!   address-set, cluster-unique-tag                        vlan
//! ```
//!
//! Members of a pool, and pools themselves, have no edges between each other
//! and are provisioned concurrently.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::ProvisionerConfig;
use crate::domain::{AddressSet, DeviceRole, Hostname, NetworkType, PoolSpec};
use crate::errors::{ProvisionError, ProvisionResult};
use crate::graph::{NodeKind, Resource, ResourceGraph};
use crate::provider::{
    Device, DeviceNode, MetalProvider, NetworkTypeBinding, NetworkTypeRequest, PortAttachment,
    PortAttachmentRequest, Vlan,
};

/// Nodes registered for one device
#[derive(Debug, Clone)]
pub struct ProvisionedDevice {
    pub hostname: Hostname,
    pub device: Resource<Device>,
    pub network_type: Resource<NetworkTypeBinding>,
    pub port: Resource<PortAttachment>,
}

/// Register the network-type change and VLAN port attachment of a device
///
/// The attachment depends on the network-type node, so it is only requested
/// once the provider has acknowledged the new network mode.
pub fn attach_to_vlan(
    graph: &ResourceGraph,
    provider: &Arc<dyn MetalProvider>,
    hostname: &Hostname,
    device: &Resource<Device>,
    vlan: &Resource<Vlan>,
    network_type: NetworkType,
    port_name: &str,
) -> ProvisionResult<(Resource<NetworkTypeBinding>, Resource<PortAttachment>)> {
    let type_node = format!("network-type/{}", hostname);
    let binding = {
        let provider = provider.clone();
        let created = device.value().clone();
        let node = type_node.clone();
        graph.register(
            type_node,
            NodeKind::Attachment,
            vec![device.dependency()],
            move || async move {
                let device = created.get().await?;
                provider
                    .set_network_type(NetworkTypeRequest {
                        device_id: device.id.clone(),
                        network_type,
                    })
                    .await
                    .map_err(|e| ProvisionError::provider(node, e))
            },
        )?
    };

    let port_node = format!("port-attachment/{}", hostname);
    let attachment = {
        let provider = provider.clone();
        let bound = binding.value().clone();
        let vlan_value = vlan.value().clone();
        let port_name = port_name.to_string();
        let node = port_node.clone();
        graph.register(
            port_node,
            NodeKind::Attachment,
            vec![binding.dependency(), vlan.dependency()],
            move || async move {
                let bound = bound.get().await?;
                let vlan = vlan_value.get().await?;
                provider
                    .attach_port(PortAttachmentRequest {
                        device_id: bound.device_id.clone(),
                        port_name,
                        vxlan: vlan.vxlan,
                    })
                    .await
                    .map_err(|e| ProvisionError::provider(node, e))
            },
        )?
    };

    Ok((binding, attachment))
}

/// Provisions homogeneous worker pools into a shared graph
pub struct DevicePoolProvisioner<'g> {
    graph: &'g ResourceGraph,
    provider: Arc<dyn MetalProvider>,
    config: Arc<ProvisionerConfig>,
    project_id: String,
    metro: String,
    vlan: Resource<Vlan>,
    addresses: Resource<AddressSet>,
    cluster_tag: Resource<String>,
}

impl<'g> DevicePoolProvisioner<'g> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: &'g ResourceGraph,
        provider: Arc<dyn MetalProvider>,
        config: Arc<ProvisionerConfig>,
        project_id: impl Into<String>,
        metro: impl Into<String>,
        vlan: Resource<Vlan>,
        addresses: Resource<AddressSet>,
        cluster_tag: Resource<String>,
    ) -> Self {
        Self {
            graph,
            provider,
            config,
            project_id: project_id.into(),
            metro: metro.into(),
            vlan,
            addresses,
            cluster_tag,
        }
    }

    /// Register every member of `pool`, named `{role}-1` through `{role}-{count}`
    pub fn provision(&self, pool: &PoolSpec) -> ProvisionResult<Vec<ProvisionedDevice>> {
        (1..=pool.count)
            .map(|index| self.provision_member(pool, index))
            .collect()
    }

    fn provision_member(&self, pool: &PoolSpec, index: u32) -> ProvisionResult<ProvisionedDevice> {
        let hostname = Hostname::for_pool_member(pool.role.as_str(), index)?;
        let node = format!("device/{}", hostname);

        let device = {
            let provider = self.provider.clone();
            let config = self.config.clone();
            let addresses = self.addresses.value().clone();
            let cluster_tag = self.cluster_tag.value().clone();
            let template = WorkerTemplate {
                role: pool.role,
                index,
                hostname: hostname.clone(),
                device_type: pool.device_type.clone(),
                metro: self.metro.clone(),
                project_id: self.project_id.clone(),
            };
            let name = node.clone();

            self.graph.register(
                node,
                NodeKind::Compute,
                vec![self.addresses.dependency(), self.cluster_tag.dependency()],
                move || async move {
                    let addresses = addresses.get().await?;
                    let cluster_tag = cluster_tag.get().await?;
                    let request = template.into_request(&config, &addresses, &cluster_tag);
                    provider
                        .create_device(request)
                        .await
                        .map_err(|e| ProvisionError::provider(name, e))
                },
            )?
        };

        let (network_type, port) = attach_to_vlan(
            self.graph,
            &self.provider,
            &hostname,
            &device,
            &self.vlan,
            self.config.worker_network_type,
            &self.config.worker_port,
        )?;

        Ok(ProvisionedDevice {
            hostname,
            device,
            network_type,
            port,
        })
    }
}

/// Worker fields known before any remote value resolves
struct WorkerTemplate {
    role: DeviceRole,
    index: u32,
    hostname: Hostname,
    device_type: String,
    metro: String,
    project_id: String,
}

impl WorkerTemplate {
    fn into_request(
        self,
        config: &ProvisionerConfig,
        addresses: &AddressSet,
        cluster_tag: &str,
    ) -> DeviceNode {
        let tags: BTreeSet<String> = [
            self.role.as_str().to_string(),
            config.worker_tag.clone(),
            cluster_tag.to_string(),
        ]
        .into_iter()
        .collect();

        DeviceNode {
            role: self.role,
            index: self.index,
            hostname: self.hostname,
            device_type: self.device_type,
            metro: self.metro,
            project_id: self.project_id,
            operating_system: config.worker_operating_system.clone(),
            billing_cycle: config.billing_cycle.clone(),
            always_pxe: true,
            tags,
            ipxe_script_url: Some(config.ipxe_url(addresses.admin_ip)),
            user_data: None,
            custom_data: None,
        }
    }
}
