// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cluster Provisioning
//!
//! [`ClusterProvisioner`] turns a [`ClusterSpec`] into a [`ClusterPlan`]: a
//! fully wired [`ResourceGraph`] in which nothing has run yet. Realizing the
//! plan drives every node in dependency order and yields the
//! [`ClusterOutputs`].
//!
//! # Graph
//!
//! ```text
//! Identity   api-key   cluster-unique-tag   private-key   ssh-key-suffix
//!                               │                │              │
//!                               │                └──► ssh-key ◄─┘
//! Network    vlan     reserved-ip-block ◄┘
//!              │             │
//!              ├─► gateway ◄─┤
//!              │             └─► address-set
//!              │                     │
//! Workers      │       device/{role}-{i} ─► network-type/… ─► port-attachment/…
//!              │                     │
//! Admin        │       bootstrap-payload   cloud-config/admin
//!              │                     │            │
//!              │                     └► device/admin ◄┘
//!              └──────────────► network-type/admin ─► port-attachment/admin
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use metal_cluster::config::ProvisionerConfig;
//! use metal_cluster::domain::ClusterSpec;
//! use metal_cluster::provider::*;
//! use metal_cluster::service::ClusterProvisioner;
//!
//! # tokio_test::block_on(async {
//! let provisioner = ClusterProvisioner::new(
//!     Arc::new(RecordingProvider::new()),
//!     Arc::new(StaticKeypairGenerator::default()),
//!     Arc::new(DeterministicRandom::default()),
//!     Arc::new(MimeMultipartRenderer::default()),
//!     ProvisionerConfig::default(),
//! );
//!
//! let spec = ClusterSpec::new("rawkode", "project-1", "am").with_data_plane(1, "c3.small.x86");
//! let outputs = provisioner.provision(&spec).await.unwrap();
//! assert_eq!(outputs.admin_ip, "145.40.64.2");
//! # });
//! ```

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{info, warn};

use super::bootstrap::{AdminBootstrapAssembler, BootstrapInputs};
use super::pool::{attach_to_vlan, DevicePoolProvisioner, ProvisionedDevice};
use crate::config::ProvisionerConfig;
use crate::domain::invariants::{validate_cluster_spec, worker_total};
use crate::domain::{partition, AddressSet, ClusterOutputs, ClusterSpec, DeviceRole, Hostname};
use crate::errors::{ProvisionError, ProvisionResult};
use crate::frp::AsyncValue;
use crate::graph::{NodeKind, Resource, ResourceGraph};
use crate::provider::{
    ApiKey, ApiKeyRequest, Device, DeviceNode, GatewayRequest, IpBlockRequest, Keypair,
    KeypairGenerator, KeypairSpec, MetalProvider, RandomStringGenerator, RandomStringSpec,
    ReservedBlock, SshKey, SshKeyRequest, UserDataRenderer, Vlan, VlanRequest,
};

/// Builds and realizes cluster resource graphs
#[derive(Clone)]
pub struct ClusterProvisioner {
    provider: Arc<dyn MetalProvider>,
    keys: Arc<dyn KeypairGenerator>,
    random: Arc<dyn RandomStringGenerator>,
    renderer: Arc<dyn UserDataRenderer>,
    config: Arc<ProvisionerConfig>,
}

impl std::fmt::Debug for ClusterProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterProvisioner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A wired, not yet realized cluster
pub struct ClusterPlan {
    graph: ResourceGraph,
    workers: Vec<ProvisionedDevice>,
    admin: Resource<Device>,
    admin_ip: AsyncValue<Ipv4Addr>,
    private_key: AsyncValue<String>,
}

impl std::fmt::Debug for ClusterPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterPlan")
            .field("graph", &self.graph)
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl ClusterPlan {
    pub fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Worker devices in address order
    pub fn workers(&self) -> &[ProvisionedDevice] {
        &self.workers
    }

    pub fn admin(&self) -> &Resource<Device> {
        &self.admin
    }

    /// Run every node; outputs are only returned if all of them succeeded
    pub async fn realize(&self) -> ProvisionResult<ClusterOutputs> {
        self.graph.realize().await?;

        let admin_ip = self.admin_ip.get().await?;
        let private_key = self.private_key.get().await?;

        info!(admin_ip = %admin_ip, "Cluster realized");
        Ok(ClusterOutputs {
            admin_ip: admin_ip.to_string(),
            private_ssh_key: private_key.as_str().to_owned(),
        })
    }
}

impl ClusterProvisioner {
    pub fn new(
        provider: Arc<dyn MetalProvider>,
        keys: Arc<dyn KeypairGenerator>,
        random: Arc<dyn RandomStringGenerator>,
        renderer: Arc<dyn UserDataRenderer>,
        config: ProvisionerConfig,
    ) -> Self {
        Self {
            provider,
            keys,
            random,
            renderer,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Plan and realize a cluster
    pub async fn provision(&self, spec: &ClusterSpec) -> ProvisionResult<ClusterOutputs> {
        let plan = self.plan(spec)?;
        plan.realize().await.map_err(|err| {
            warn!(cluster = %spec.cluster_name, error = %err, "Cluster provisioning failed");
            err
        })
    }

    /// Validate `spec` and wire its resource graph
    ///
    /// No provider call is made; a rejected spec never reaches the provider.
    pub fn plan(&self, spec: &ClusterSpec) -> ProvisionResult<ClusterPlan> {
        self.config.validate()?;
        validate_cluster_spec(spec, self.config.block_quantity)?;
        let worker_count = worker_total(spec)?;

        info!(
            cluster = %spec.cluster_name,
            metro = %spec.metro,
            control_plane = spec.control_plane_count,
            data_plane = spec.data_plane_count,
            "Planning cluster"
        );

        let graph = ResourceGraph::new();
        let identity = self.identity(&graph, spec)?;
        let network = self.network(&graph, spec, &identity, worker_count)?;

        let pools = DevicePoolProvisioner::new(
            &graph,
            self.provider.clone(),
            self.config.clone(),
            spec.project_id.clone(),
            spec.metro.clone(),
            network.vlan.clone(),
            network.addresses.clone(),
            identity.cluster_tag.clone(),
        );
        let mut workers = Vec::with_capacity(worker_count as usize);
        for pool in spec.pools() {
            workers.extend(pools.provision(&pool)?);
        }

        let admin = self.admin(&graph, spec, &identity, &network)?;

        let admin_ip = network.addresses.value().map(|a| a.admin_ip);
        let private_key = identity
            .keypair
            .value()
            .map(|k| k.private_key_openssh.clone());

        Ok(ClusterPlan {
            graph,
            workers,
            admin,
            admin_ip,
            private_key,
        })
    }

    fn identity(&self, graph: &ResourceGraph, spec: &ClusterSpec) -> ProvisionResult<Identity> {
        let api_key = {
            let provider = self.provider.clone();
            let request = ApiKeyRequest {
                project_id: spec.project_id.clone(),
                read_only: true,
                description: format!("Read-only API key for EKSA cluster {}", spec.cluster_name),
            };
            graph.register("api-key", NodeKind::Identity, vec![], move || async move {
                provider
                    .create_project_api_key(request)
                    .await
                    .map_err(|e| ProvisionError::provider("api-key", e))
            })?
        };

        let cluster_tag =
            self.random_string(graph, "cluster-unique-tag", self.config.cluster_tag_length)?;
        let suffix =
            self.random_string(graph, "ssh-key-suffix", self.config.ssh_key_suffix_length)?;

        let keypair = {
            let keys = self.keys.clone();
            let key_spec = KeypairSpec::rsa(self.config.rsa_bits);
            graph.register("private-key", NodeKind::Identity, vec![], move || async move {
                keys.generate(key_spec)
                    .await
                    .map_err(|e| ProvisionError::provider("private-key", e))
            })?
        };

        let ssh_key = {
            let provider = self.provider.clone();
            let cluster_name = spec.cluster_name.clone();
            let key = keypair.value().clone();
            let suffix_value = suffix.value().clone();
            graph.register(
                "ssh-key",
                NodeKind::Identity,
                vec![keypair.dependency(), suffix.dependency()],
                move || async move {
                    let key = key.get().await?;
                    let suffix = suffix_value.get().await?;
                    provider
                        .create_ssh_key(SshKeyRequest {
                            name: format!("{}-{}", cluster_name, suffix),
                            public_key: key.public_key_openssh.clone(),
                        })
                        .await
                        .map_err(|e| ProvisionError::provider("ssh-key", e))
                },
            )?
        };

        Ok(Identity {
            api_key,
            cluster_tag,
            keypair,
            ssh_key,
        })
    }

    fn random_string(
        &self,
        graph: &ResourceGraph,
        name: &'static str,
        length: usize,
    ) -> ProvisionResult<Resource<String>> {
        let random = self.random.clone();
        graph.register(name, NodeKind::Identity, vec![], move || async move {
            random
                .generate(RandomStringSpec::lower_alphanumeric(length))
                .await
                .map_err(|e| ProvisionError::provider(name, e))
        })
    }

    fn network(
        &self,
        graph: &ResourceGraph,
        spec: &ClusterSpec,
        identity: &Identity,
        workers: u32,
    ) -> ProvisionResult<Network> {
        let vlan = {
            let provider = self.provider.clone();
            let request = VlanRequest {
                project_id: spec.project_id.clone(),
                metro: spec.metro.clone(),
                description: format!("EKSA cluster {}", spec.cluster_name),
            };
            graph.register("vlan", NodeKind::Network, vec![], move || async move {
                provider
                    .create_vlan(request)
                    .await
                    .map_err(|e| ProvisionError::provider("vlan", e))
            })?
        };

        let block = {
            let provider = self.provider.clone();
            let tag = identity.cluster_tag.value().clone();
            let project_id = spec.project_id.clone();
            let metro = spec.metro.clone();
            let block_type = self.config.block_type.clone();
            let quantity = self.config.block_quantity;
            graph.register(
                "reserved-ip-block",
                NodeKind::Network,
                vec![identity.cluster_tag.dependency()],
                move || async move {
                    let tag = tag.get().await?;
                    provider
                        .reserve_ip_block(IpBlockRequest {
                            project_id,
                            metro,
                            block_type,
                            quantity,
                            tags: vec![tag.as_str().to_owned()],
                        })
                        .await
                        .map_err(|e| ProvisionError::provider("reserved-ip-block", e))
                },
            )?
        };

        {
            let provider = self.provider.clone();
            let vlan_value = vlan.value().clone();
            let block_value = block.value().clone();
            let project_id = spec.project_id.clone();
            graph.register(
                "gateway",
                NodeKind::Network,
                vec![vlan.dependency(), block.dependency()],
                move || async move {
                    let vlan = vlan_value.get().await?;
                    let block = block_value.get().await?;
                    provider
                        .create_gateway(GatewayRequest {
                            project_id,
                            vlan_id: vlan.id.clone(),
                            ip_reservation_id: block.id.clone(),
                        })
                        .await
                        .map_err(|e| ProvisionError::provider("gateway", e))
                },
            )?;
        }

        let addresses = {
            let block_value = block.value().clone();
            let quantity = self.config.block_quantity;
            graph.register(
                "address-set",
                NodeKind::Derived,
                vec![block.dependency()],
                move || async move {
                    let block = block_value.get().await?;
                    partition(&block.cidr, quantity, workers)
                },
            )?
        };

        Ok(Network {
            vlan,
            block,
            addresses,
        })
    }

    fn admin(
        &self,
        graph: &ResourceGraph,
        spec: &ClusterSpec,
        identity: &Identity,
        network: &Network,
    ) -> ProvisionResult<Resource<Device>> {
        let payload = {
            let inputs = BootstrapInputs {
                cluster_name: spec.cluster_name.clone(),
                project_id: spec.project_id.clone(),
                control_plane_count: spec.control_plane_count,
                data_plane_count: spec.data_plane_count,
                api_key: identity.api_key.value().clone(),
                cluster_tag: identity.cluster_tag.value().clone(),
                block: network.block.value().clone(),
                addresses: network.addresses.value().clone(),
                keypair: identity.keypair.value().clone(),
            };
            graph.register(
                "bootstrap-payload",
                NodeKind::Bootstrap,
                vec![
                    identity.api_key.dependency(),
                    identity.cluster_tag.dependency(),
                    identity.keypair.dependency(),
                    network.block.dependency(),
                    network.addresses.dependency(),
                ],
                move || async move {
                    let json = AdminBootstrapAssembler.assemble(inputs).get().await?;
                    Ok(json.as_str().to_owned())
                },
            )?
        };

        let user_data = {
            let renderer = self.renderer.clone();
            let parts = self.config.admin_user_data.clone();
            graph.register("cloud-config/admin", NodeKind::Bootstrap, vec![], move || async move {
                renderer
                    .render(&parts)
                    .map_err(|e| ProvisionError::provider("cloud-config/admin", e))
            })?
        };

        let hostname = Hostname::new(DeviceRole::Admin.as_str())?;
        let node = format!("device/{}", hostname);
        let device = {
            let provider = self.provider.clone();
            let payload_value = payload.value().clone();
            let user_data_value = user_data.value().clone();
            let tags: BTreeSet<String> = [self.config.admin_tag.clone()].into_iter().collect();
            let request = DeviceNode {
                role: DeviceRole::Admin,
                index: 1,
                hostname: hostname.clone(),
                device_type: spec.control_plane_device_type.clone(),
                metro: spec.metro.clone(),
                project_id: spec.project_id.clone(),
                operating_system: self.config.admin_operating_system.clone(),
                billing_cycle: self.config.billing_cycle.clone(),
                always_pxe: false,
                tags,
                ipxe_script_url: None,
                user_data: None,
                custom_data: None,
            };
            let name = node.clone();
            graph.register(
                node,
                NodeKind::Compute,
                vec![
                    identity.keypair.dependency(),
                    identity.ssh_key.dependency(),
                    network.block.dependency(),
                    network.addresses.dependency(),
                    payload.dependency(),
                    user_data.dependency(),
                ],
                move || async move {
                    let custom_data = payload_value.get().await?;
                    let user_data = user_data_value.get().await?;
                    let request = DeviceNode {
                        user_data: Some(user_data.as_str().to_owned()),
                        custom_data: Some(custom_data.as_str().to_owned()),
                        ..request
                    };
                    provider
                        .create_device(request)
                        .await
                        .map_err(|e| ProvisionError::provider(name, e))
                },
            )?
        };

        attach_to_vlan(
            graph,
            &self.provider,
            &hostname,
            &device,
            &network.vlan,
            self.config.admin_network_type,
            &self.config.admin_port,
        )?;

        Ok(device)
    }
}

/// Identity nodes shared by the network and admin branches
struct Identity {
    api_key: Resource<ApiKey>,
    cluster_tag: Resource<String>,
    keypair: Resource<Keypair>,
    ssh_key: Resource<SshKey>,
}

struct Network {
    vlan: Resource<Vlan>,
    block: Resource<ReservedBlock>,
    addresses: Resource<AddressSet>,
}
