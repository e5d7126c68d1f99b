// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reserved Block Address Partitioning
//!
//! One reserved block is carved into fixed-purpose addresses:
//!
//! ```text
//! offset:  0        1        2       3 .. 3+W-1       Q-3       Q-2     Q-1
//!          network  gateway  admin   workers (cp, dp)  tink VIP  pool VIP broadcast
//! ```
//!
//! Workers grow upward from the admin address and the two VIPs sit at the top
//! of the block; [`partition`] refuses any layout where the two meet.

use ipnet::Ipv4Net;
use serde::Serialize;
use std::net::Ipv4Addr;

use super::invariants::{validate_worker_capacity, ValidationError};
use super::network::{block_size, host};
use crate::errors::ProvisionResult;

/// Host offset of the admin/provisioner node
pub const ADMIN_OFFSET: u32 = 2;

/// Host offset of the first worker
pub const FIRST_WORKER_OFFSET: u32 = ADMIN_OFFSET + 1;

/// Distance of the load-balancer pool VIP from the block size
pub const POOL_VIP_FROM_TOP: u32 = 2;

/// Distance of the provisioning-service VIP from the block size
pub const TINK_VIP_FROM_TOP: u32 = 3;

/// Named addresses carved out of one reserved block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSet {
    pub admin_ip: Ipv4Addr,
    pub pool_vip: Ipv4Addr,
    pub tink_vip: Ipv4Addr,
    /// Control-plane addresses first, then data-plane addresses
    pub worker_ips: Vec<Ipv4Addr>,
}

impl AddressSet {
    /// Worker addresses as one comma-separated string, in pool order
    pub fn worker_ips_joined(&self) -> String {
        self.worker_ips
            .iter()
            .map(Ipv4Addr::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Every address in the set, fixed-purpose ones first
    pub fn all(&self) -> Vec<Ipv4Addr> {
        let mut all = vec![self.admin_ip, self.pool_vip, self.tink_vip];
        all.extend(self.worker_ips.iter().copied());
        all
    }
}

/// Partition `network` (holding `quantity` addresses) for `workers` workers
///
/// Deterministic: the same inputs always produce the same set.
///
/// # Examples
///
/// ```rust
/// use metal_cluster::domain::addressing::partition;
/// use metal_cluster::domain::network::parse_block;
///
/// let block = parse_block("10.0.0.0/28").unwrap();
/// let set = partition(&block, 16, 2).unwrap();
///
/// assert_eq!(set.admin_ip.to_string(), "10.0.0.2");
/// assert_eq!(set.worker_ips_joined(), "10.0.0.3,10.0.0.4");
/// assert_eq!(set.tink_vip.to_string(), "10.0.0.13");
/// assert_eq!(set.pool_vip.to_string(), "10.0.0.14");
/// ```
pub fn partition(network: &Ipv4Net, quantity: u32, workers: u32) -> ProvisionResult<AddressSet> {
    validate_worker_capacity(quantity, workers)?;

    if block_size(network) != u64::from(quantity) {
        return Err(ValidationError::BlockSizeMismatch {
            cidr: network.to_string(),
            quantity,
        }
        .into());
    }

    let admin_ip = host(network, ADMIN_OFFSET)?;
    let pool_vip = host(network, quantity - POOL_VIP_FROM_TOP)?;
    let tink_vip = host(network, quantity - TINK_VIP_FROM_TOP)?;

    let worker_ips = (0..workers)
        .map(|i| host(network, FIRST_WORKER_OFFSET + i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AddressSet {
        admin_ip,
        pool_vip,
        tink_vip,
        worker_ips,
    })
}
