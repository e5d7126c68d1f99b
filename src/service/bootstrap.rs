// Copyright (c) 2025 - Cowboy AI, Inc.
//! Admin Bootstrap Payload
//!
//! The admin node boots with a JSON document describing the whole cluster:
//! credentials, the address plan and the pool sizes. Every field comes from a
//! different part of the graph, so the payload is a single `join_all` over
//! fifteen values and exists only once all of them have resolved.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::domain::AddressSet;
use crate::errors::ProvisionResult;
use crate::frp::{join_all, AsyncValue};
use crate::provider::{ApiKey, Keypair, ReservedBlock};

/// JSON document delivered to the admin node as custom data
///
/// Holds the private key and the API token; `Debug` redacts both.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct AdminBootstrapPayload {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    #[serde(rename = "clusterTag")]
    pub cluster_tag: String,
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub cidr: String,
    pub netmask: String,
    pub gateway: String,
    #[serde(rename = "adminIP")]
    pub admin_ip: String,
    #[serde(rename = "poolVIP")]
    pub pool_vip: String,
    #[serde(rename = "tinkVIP")]
    pub tink_vip: String,
    #[serde(rename = "workerIPs")]
    pub worker_ips: String,
    #[serde(rename = "publicSshKey")]
    pub public_ssh_key: String,
    #[serde(rename = "privateSshKey")]
    pub private_ssh_key: String,
    #[serde(rename = "controlPlaneCount")]
    pub control_plane_count: u32,
    #[serde(rename = "dataPlaneCount")]
    pub data_plane_count: u32,
}

impl fmt::Debug for AdminBootstrapPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminBootstrapPayload")
            .field("api_key", &"<redacted>")
            .field("cluster_name", &self.cluster_name)
            .field("cluster_tag", &self.cluster_tag)
            .field("project_id", &self.project_id)
            .field("cidr", &self.cidr)
            .field("admin_ip", &self.admin_ip)
            .field("pool_vip", &self.pool_vip)
            .field("tink_vip", &self.tink_vip)
            .field("worker_ips", &self.worker_ips)
            .field("private_ssh_key", &"<redacted>")
            .field("control_plane_count", &self.control_plane_count)
            .field("data_plane_count", &self.data_plane_count)
            .finish()
    }
}

impl AdminBootstrapPayload {
    pub fn to_json(&self) -> ProvisionResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Values the admin payload is assembled from
#[derive(Debug, Clone)]
pub struct BootstrapInputs {
    pub cluster_name: String,
    pub project_id: String,
    pub control_plane_count: u32,
    pub data_plane_count: u32,
    pub api_key: AsyncValue<ApiKey>,
    pub cluster_tag: AsyncValue<String>,
    pub block: AsyncValue<ReservedBlock>,
    pub addresses: AsyncValue<AddressSet>,
    pub keypair: AsyncValue<Keypair>,
}

/// Joins the admin node's inputs into its bootstrap payload
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminBootstrapAssembler;

impl AdminBootstrapAssembler {
    /// Payload resolved once every input has resolved
    pub fn payload(&self, inputs: BootstrapInputs) -> AsyncValue<AdminBootstrapPayload> {
        let BootstrapInputs {
            cluster_name,
            project_id,
            control_plane_count,
            data_plane_count,
            api_key,
            cluster_tag,
            block,
            addresses,
            keypair,
        } = inputs;

        join_all((
            api_key.map(|key| key.token.clone()),
            AsyncValue::constant(cluster_name),
            cluster_tag,
            AsyncValue::constant(project_id),
            block.map(|b| b.cidr.to_string()),
            block.map(|b| b.netmask.to_string()),
            block.map(|b| b.gateway.to_string()),
            addresses.map(|a| a.admin_ip.to_string()),
            addresses.map(|a| a.pool_vip.to_string()),
            addresses.map(|a| a.tink_vip.to_string()),
            addresses.map(AddressSet::worker_ips_joined),
            keypair.map(|k| k.public_key_openssh.clone()),
            keypair.map(|k| k.private_key_openssh.clone()),
            AsyncValue::constant(control_plane_count),
            AsyncValue::constant(data_plane_count),
        ))
        .map(
            |(
                api_key,
                cluster_name,
                cluster_tag,
                project_id,
                cidr,
                netmask,
                gateway,
                admin_ip,
                pool_vip,
                tink_vip,
                worker_ips,
                public_ssh_key,
                private_ssh_key,
                control_plane_count,
                data_plane_count,
            )| AdminBootstrapPayload {
                api_key: owned(api_key),
                cluster_name: owned(cluster_name),
                cluster_tag: owned(cluster_tag),
                project_id: owned(project_id),
                cidr: owned(cidr),
                netmask: owned(netmask),
                gateway: owned(gateway),
                admin_ip: owned(admin_ip),
                pool_vip: owned(pool_vip),
                tink_vip: owned(tink_vip),
                worker_ips: owned(worker_ips),
                public_ssh_key: owned(public_ssh_key),
                private_ssh_key: owned(private_ssh_key),
                control_plane_count: **control_plane_count,
                data_plane_count: **data_plane_count,
            },
        )
    }

    /// Payload serialized to its JSON document form
    pub fn assemble(&self, inputs: BootstrapInputs) -> AsyncValue<String> {
        self.payload(inputs).try_map(AdminBootstrapPayload::to_json)
    }
}

fn owned(value: &Arc<String>) -> String {
    value.as_str().to_owned()
}
