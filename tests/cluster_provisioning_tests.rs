// Copyright (c) 2025 - Cowboy AI, Inc.
//! End-to-end provisioning against the recording provider
//!
//! These tests drive the full graph (identity, network, worker pools, admin
//! node) and inspect the requests the provider received.

mod fixtures;

use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

use fixtures::*;
use metal_cluster::domain::{DeviceRole, NetworkType};
use metal_cluster::provider::{Phase, ProviderCall};
use metal_cluster::state_machine::NodeStatus;

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_small_cluster_outputs() {
    let provider = Arc::new(recording_provider());
    let outputs = provisioner(provider.clone())
        .provision(&small_spec())
        .await
        .unwrap();

    assert_eq!(outputs.admin_ip, "10.0.0.2");
    assert_eq!(outputs.private_ssh_key, PRIVATE_KEY);
    assert!(!format!("{:?}", outputs).contains("fixture"));

    let devices = provider.device_requests();
    assert_eq!(devices.len(), 3);
    let workers: Vec<_> = devices.iter().filter(|d| d.role.is_worker()).collect();
    assert_eq!(workers.len(), 2);
    for worker in workers {
        assert_eq!(worker.ipxe_script_url.as_deref(), Some("http://10.0.0.2/ipxe/"));
        assert_eq!(worker.operating_system, "custom_ipxe");
        assert!(worker.always_pxe);
        assert_eq!(worker.billing_cycle, "hourly");
        assert!(worker.custom_data.is_none());
    }
}

#[tokio::test]
async fn test_admin_payload() {
    let provider = Arc::new(recording_provider());
    provisioner(provider.clone())
        .provision(&small_spec())
        .await
        .unwrap();

    let admin = provider
        .device_requests()
        .into_iter()
        .find(|d| d.role == DeviceRole::Admin)
        .unwrap();
    let payload: serde_json::Value =
        serde_json::from_str(admin.custom_data.as_deref().unwrap()).unwrap();

    assert_eq!(
        payload,
        json!({
            "apiKey": "token-key-0001",
            "clusterName": CLUSTER_NAME,
            "clusterTag": CLUSTER_TAG,
            "projectID": PROJECT_ID,
            "cidr": "10.0.0.0/28",
            "netmask": "255.255.255.240",
            "gateway": "10.0.0.1",
            "adminIP": "10.0.0.2",
            "poolVIP": "10.0.0.14",
            "tinkVIP": "10.0.0.13",
            "workerIPs": "10.0.0.3,10.0.0.4",
            "publicSshKey": PUBLIC_KEY,
            "privateSshKey": PRIVATE_KEY,
            "controlPlaneCount": 1,
            "dataPlaneCount": 1
        })
    );

    assert_eq!(admin.hostname.as_str(), "admin");
    assert_eq!(admin.device_type, "c3.medium.x86");
    assert_eq!(admin.operating_system, "ubuntu_20_04");
    assert_eq!(admin.tags, tags(&["tink-provisioner"]));
    assert!(admin.ipxe_script_url.is_none());
    assert!(admin
        .user_data
        .as_deref()
        .unwrap()
        .starts_with("Content-Type: multipart/mixed"));
}

#[tokio::test]
async fn test_worker_naming_and_tags() {
    let provider = Arc::new(recording_provider());
    let spec = small_spec()
        .with_control_plane(2, "c3.medium.x86")
        .with_data_plane(3, "m3.small.x86");
    provisioner(provider.clone()).provision(&spec).await.unwrap();

    let mut names: Vec<String> = provider
        .device_requests()
        .iter()
        .filter(|d| d.role.is_worker())
        .map(|d| d.hostname.to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "control-plane-1",
            "control-plane-2",
            "data-plane-1",
            "data-plane-2",
            "data-plane-3"
        ]
    );

    for device in provider.device_requests() {
        match device.role {
            DeviceRole::ControlPlane => {
                assert_eq!(device.device_type, "c3.medium.x86");
                assert_eq!(device.tags, tags(&["control-plane", "tink-worker", CLUSTER_TAG]));
            }
            DeviceRole::DataPlane => {
                assert_eq!(device.device_type, "m3.small.x86");
                assert_eq!(device.tags, tags(&["data-plane", "tink-worker", CLUSTER_TAG]));
            }
            DeviceRole::Admin => {}
        }
    }
}

#[tokio::test]
async fn test_identity_and_network_requests() {
    let provider = Arc::new(recording_provider());
    provisioner(provider.clone())
        .provision(&small_spec())
        .await
        .unwrap();

    let calls = provider.calls();
    let api_key = calls
        .iter()
        .find_map(|c| match c {
            ProviderCall::CreateApiKey(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert!(api_key.read_only);
    assert_eq!(api_key.description, "Read-only API key for EKSA cluster rawkode");

    let block = calls
        .iter()
        .find_map(|c| match c {
            ProviderCall::ReserveIpBlock(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(block.quantity, 16);
    assert_eq!(block.block_type, "public_ipv4");
    assert_eq!(block.tags, vec![CLUSTER_TAG.to_string()]);

    let ssh_key = calls
        .iter()
        .find_map(|c| match c {
            ProviderCall::CreateSshKey(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(ssh_key.name, format!("{}-{}", CLUSTER_NAME, SSH_KEY_SUFFIX));
    assert_eq!(ssh_key.public_key, PUBLIC_KEY);

    let gateway = calls
        .iter()
        .find_map(|c| match c {
            ProviderCall::CreateGateway(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(gateway.vlan_id, "vlan-0001");
    assert_eq!(gateway.ip_reservation_id, "block-0001");
}

#[tokio::test]
async fn test_network_type_and_ports() {
    let provider = Arc::new(recording_provider());
    provisioner(provider.clone())
        .provision(&small_spec())
        .await
        .unwrap();

    for call in provider.calls() {
        match call {
            ProviderCall::SetNetworkType { hostname, request } => {
                let expected = if hostname.as_str() == "admin" {
                    NetworkType::Hybrid
                } else {
                    NetworkType::Layer2Individual
                };
                assert_eq!(request.network_type, expected);
            }
            ProviderCall::AttachPort { hostname, request } => {
                let expected = if hostname.as_str() == "admin" { "bond0" } else { "eth0" };
                assert_eq!(request.port_name, expected);
                assert_eq!(request.vxlan.value(), 1000);
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_port_attachment_waits_for_network_type() {
    let provider = Arc::new(
        recording_provider()
            .with_latency_for("network-type/data-plane-1", std::time::Duration::from_millis(30))
            .with_latency_for("network-type/admin", std::time::Duration::from_millis(10)),
    );
    provisioner(provider.clone())
        .provision(&small_spec())
        .await
        .unwrap();

    for host in ["control-plane-1", "data-plane-1", "admin"] {
        let device_done = provider
            .position(Phase::Completed, &format!("device/{}", host))
            .unwrap();
        let type_issued = provider
            .position(Phase::Issued, &format!("network-type/{}", host))
            .unwrap();
        let type_done = provider
            .position(Phase::Completed, &format!("network-type/{}", host))
            .unwrap();
        let port_issued = provider
            .position(Phase::Issued, &format!("port-attachment/{}", host))
            .unwrap();

        assert!(device_done < type_issued, "{} network type before device", host);
        assert!(type_done < port_issued, "{} port before network type", host);
    }
}

#[tokio::test]
async fn test_devices_are_created_concurrently() {
    let provider = Arc::new(
        recording_provider().with_latency(std::time::Duration::from_millis(20)),
    );
    provisioner(provider.clone())
        .provision(&small_spec())
        .await
        .unwrap();

    let cp_issued = provider.position(Phase::Issued, "device/control-plane-1").unwrap();
    let dp_issued = provider.position(Phase::Issued, "device/data-plane-1").unwrap();
    let cp_done = provider.position(Phase::Completed, "device/control-plane-1").unwrap();
    let dp_done = provider.position(Phase::Completed, "device/data-plane-1").unwrap();

    assert!(cp_issued < dp_done);
    assert!(dp_issued < cp_done);
}

#[tokio::test]
async fn test_plan_issues_nothing_until_realized() {
    let provider = Arc::new(recording_provider());
    let plan = provisioner(provider.clone()).plan(&small_spec()).unwrap();

    tokio::task::yield_now().await;
    assert!(provider.calls().is_empty());
    assert_eq!(plan.workers().len(), 2);

    plan.realize().await.unwrap();

    let report = plan.graph().report();
    assert_eq!(report.len(), 20);
    assert_eq!(report.with_status(NodeStatus::Created).len(), 20);
    assert_eq!(
        report.node("port-attachment/admin").unwrap().depends_on,
        vec![
            metal_cluster::graph::NodeId::new("network-type/admin"),
            metal_cluster::graph::NodeId::new("vlan"),
        ]
    );
}

#[tokio::test]
async fn test_empty_pools_provision_admin_only() {
    let provider = Arc::new(recording_provider());
    let spec = metal_cluster::ClusterSpec::new(CLUSTER_NAME, PROJECT_ID, METRO);
    let outputs = provisioner(provider.clone()).provision(&spec).await.unwrap();

    assert_eq!(outputs.admin_ip, "10.0.0.2");
    let devices = provider.device_requests();
    assert_eq!(devices.len(), 1);

    let payload: serde_json::Value =
        serde_json::from_str(devices[0].custom_data.as_deref().unwrap()).unwrap();
    assert_eq!(payload["workerIPs"], "");
    assert_eq!(payload["controlPlaneCount"], 0);
}

#[tokio::test]
async fn test_larger_block_from_config() {
    let provider = Arc::new(
        metal_cluster::RecordingProvider::new()
            .with_block_cidr(metal_cluster::domain::network::parse_block("10.0.1.0/27").unwrap()),
    );
    let config = metal_cluster::ProvisionerConfig {
        block_quantity: 32,
        ..Default::default()
    };
    let spec = small_spec().with_data_plane(20, "c3.small.x86");
    let outputs = provisioner_with_config(provider.clone(), config)
        .provision(&spec)
        .await
        .unwrap();

    assert_eq!(outputs.admin_ip, "10.0.1.2");
    assert_eq!(provider.device_requests().len(), 22);
}
