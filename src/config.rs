// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioner Configuration
//!
//! Provider constants used when building the resource graph. Every field has
//! a default matching a stock EKS-Anywhere bare-metal cluster; deployments
//! override individual values from `METAL_*` environment variables or from a
//! serialized document.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `METAL_BLOCK_QUANTITY` | `block_quantity` |
//! | `METAL_BILLING_CYCLE` | `billing_cycle` |
//! | `METAL_WORKER_OS` | `worker_operating_system` |
//! | `METAL_ADMIN_OS` | `admin_operating_system` |
//! | `METAL_ADMIN_TAG` | `admin_tag` |
//! | `METAL_RSA_BITS` | `rsa_bits` |
//! | `METAL_IPXE_URL_TEMPLATE` | `ipxe_url_template` |

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::domain::invariants::validate_block_quantity;
use crate::domain::NetworkType;
use crate::errors::{ProvisionError, ProvisionResult};
use crate::provider::UserDataPart;

/// Placeholder substituted with the admin address in the iPXE template
pub const ADMIN_IP_PLACEHOLDER: &str = "{admin_ip}";

/// Configuration for the cluster provisioner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    /// Size of the reserved public block (power of two, at least 8)
    pub block_quantity: u32,

    /// Provider type of the reserved block
    pub block_type: String,

    /// Operating system of worker devices (booted over iPXE)
    pub worker_operating_system: String,

    /// Operating system of the admin device
    pub admin_operating_system: String,

    pub billing_cycle: String,

    pub worker_network_type: NetworkType,
    pub worker_port: String,

    pub admin_network_type: NetworkType,
    pub admin_port: String,

    /// Tag carried by the admin device
    pub admin_tag: String,

    /// Tag carried by every worker device
    pub worker_tag: String,

    pub cluster_tag_length: usize,
    pub ssh_key_suffix_length: usize,
    pub rsa_bits: u32,

    /// Worker boot URL; `{admin_ip}` is replaced with the admin address
    pub ipxe_url_template: String,

    /// Parts of the admin cloud-init document, in order
    pub admin_user_data: Vec<UserDataPart>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            block_quantity: 16,
            block_type: "public_ipv4".to_string(),
            worker_operating_system: "custom_ipxe".to_string(),
            admin_operating_system: "ubuntu_20_04".to_string(),
            billing_cycle: "hourly".to_string(),
            worker_network_type: NetworkType::Layer2Individual,
            worker_port: "eth0".to_string(),
            admin_network_type: NetworkType::Hybrid,
            admin_port: "bond0".to_string(),
            admin_tag: "tink-provisioner".to_string(),
            worker_tag: "tink-worker".to_string(),
            cluster_tag_length: 12,
            ssh_key_suffix_length: 3,
            rsa_bits: 4096,
            ipxe_url_template: format!("http://{}/ipxe/", ADMIN_IP_PLACEHOLDER),
            admin_user_data: vec![
                UserDataPart::new("text/cloud-config", "#cloud-config\n"),
                UserDataPart::new("text/x-shellscript", "#!/usr/bin/env bash\n"),
                UserDataPart::new("text/x-shellscript", "#!/usr/bin/env bash\n"),
            ],
        }
    }
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> ProvisionResult<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ProvisionError::Configuration(format!("{}={:?}: {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}

impl ProvisionerConfig {
    /// Load configuration from `METAL_*` environment variables
    ///
    /// Unset variables keep their defaults; a set but unparseable variable is
    /// an error.
    pub fn from_env() -> ProvisionResult<Self> {
        let defaults = Self::default();

        let config = Self {
            block_quantity: env_parsed("METAL_BLOCK_QUANTITY", defaults.block_quantity)?,
            billing_cycle: std::env::var("METAL_BILLING_CYCLE")
                .unwrap_or_else(|_| defaults.billing_cycle.clone()),
            worker_operating_system: std::env::var("METAL_WORKER_OS")
                .unwrap_or_else(|_| defaults.worker_operating_system.clone()),
            admin_operating_system: std::env::var("METAL_ADMIN_OS")
                .unwrap_or_else(|_| defaults.admin_operating_system.clone()),
            admin_tag: std::env::var("METAL_ADMIN_TAG")
                .unwrap_or_else(|_| defaults.admin_tag.clone()),
            rsa_bits: env_parsed("METAL_RSA_BITS", defaults.rsa_bits)?,
            ipxe_url_template: std::env::var("METAL_IPXE_URL_TEMPLATE")
                .unwrap_or_else(|_| defaults.ipxe_url_template.clone()),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from JSON; missing fields keep their defaults
    pub fn from_json(document: &str) -> ProvisionResult<Self> {
        let config: Self = serde_json::from_str(document)
            .map_err(|e| ProvisionError::Configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make every plan fail
    pub fn validate(&self) -> ProvisionResult<()> {
        validate_block_quantity(self.block_quantity)?;

        if !self.ipxe_url_template.contains(ADMIN_IP_PLACEHOLDER) {
            return Err(ProvisionError::Configuration(format!(
                "ipxe_url_template must contain {}",
                ADMIN_IP_PLACEHOLDER
            )));
        }
        if self.cluster_tag_length == 0 || self.ssh_key_suffix_length == 0 {
            return Err(ProvisionError::Configuration(
                "random identifier lengths must be positive".to_string(),
            ));
        }
        if self.rsa_bits < 2048 {
            return Err(ProvisionError::Configuration(format!(
                "rsa_bits {} is below 2048",
                self.rsa_bits
            )));
        }
        Ok(())
    }

    /// Worker boot URL for an admin address
    pub fn ipxe_url(&self, admin_ip: Ipv4Addr) -> String {
        self.ipxe_url_template
            .replace(ADMIN_IP_PLACEHOLDER, &admin_ip.to_string())
    }
}
