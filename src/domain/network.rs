// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Host offset {offset} is outside {network} ({size} addresses)")]
    HostOffsetOutOfRange {
        network: Ipv4Net,
        offset: u32,
        size: u64,
    },

    #[error("Invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),

    #[error("Unknown network type: {0}")]
    UnknownNetworkType(String),
}

/// Parse an IPv4 block in CIDR notation, normalizing host bits away
///
/// # Examples
///
/// ```rust
/// use metal_cluster::domain::network::parse_block;
///
/// let net = parse_block("10.0.0.7/28").unwrap();
/// assert_eq!(net.to_string(), "10.0.0.0/28");
/// ```
pub fn parse_block(cidr: impl AsRef<str>) -> Result<Ipv4Net, NetworkError> {
    let cidr = cidr.as_ref();
    let net = Ipv4Net::from_str(cidr).map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;
    Ok(net.trunc())
}

/// Number of addresses covered by a block
pub fn block_size(network: &Ipv4Net) -> u64 {
    1u64 << (32 - u32::from(network.prefix_len()))
}

/// The n-th address of a block, counting from the network address
///
/// Offset 0 is the network address itself; offsets that fall past the end of
/// the block are rejected.
pub fn host(network: &Ipv4Net, offset: u32) -> Result<Ipv4Addr, NetworkError> {
    let size = block_size(network);
    if u64::from(offset) >= size {
        return Err(NetworkError::HostOffsetOutOfRange {
            network: *network,
            offset,
            size,
        });
    }

    let base = u32::from(network.network());
    Ok(Ipv4Addr::from(base + offset))
}

/// VLAN identifier as assigned by the provider (the VXLAN VNID)
///
/// Invariants:
/// - Valid VLAN ID range (1-4094)
/// - VLAN 0 and 4095 are reserved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VlanId(u16);

impl VlanId {
    /// Minimum valid VLAN ID
    pub const MIN: u16 = 1;

    /// Maximum valid VLAN ID
    pub const MAX: u16 = 4094;

    /// Create a new VLAN ID with validation
    pub fn new(id: u16) -> Result<Self, NetworkError> {
        if !(Self::MIN..=Self::MAX).contains(&id) {
            return Err(NetworkError::InvalidVlanId(id));
        }

        Ok(Self(id))
    }

    /// Get the VLAN ID value
    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = NetworkError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Device network mode
///
/// Workers are moved to an isolated per-device layer-2 mode; the admin node
/// keeps its layer-3 uplink and joins the VLAN in hybrid mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkType {
    #[serde(rename = "layer3")]
    Layer3,
    #[serde(rename = "hybrid")]
    Hybrid,
    #[serde(rename = "layer2-bonded")]
    Layer2Bonded,
    #[serde(rename = "layer2-individual")]
    Layer2Individual,
}

impl NetworkType {
    /// Provider wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Layer3 => "layer3",
            Self::Hybrid => "hybrid",
            Self::Layer2Bonded => "layer2-bonded",
            Self::Layer2Individual => "layer2-individual",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "layer3" => Ok(Self::Layer3),
            "hybrid" => Ok(Self::Hybrid),
            "layer2-bonded" => Ok(Self::Layer2Bonded),
            "layer2-individual" => Ok(Self::Layer2Individual),
            other => Err(NetworkError::UnknownNetworkType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block() {
        let net = parse_block("147.75.10.16/28").unwrap();
        assert_eq!(net.prefix_len(), 28);
        assert_eq!(block_size(&net), 16);
    }

    #[test]
    fn test_parse_block_truncates_host_bits() {
        let net = parse_block("10.0.0.9/29").unwrap();
        assert_eq!(net.network(), Ipv4Addr::new(10, 0, 0, 8));
    }

    #[test]
    fn test_invalid_block() {
        assert!(parse_block("10.0.0.0").is_err());
        assert!(parse_block("10.0.0.0/33").is_err());
        assert!(parse_block("2001:db8::/64").is_err());
    }

    #[test]
    fn test_host_offsets() {
        let net = parse_block("10.0.0.0/28").unwrap();
        assert_eq!(host(&net, 0).unwrap(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(host(&net, 2).unwrap(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(host(&net, 15).unwrap(), Ipv4Addr::new(10, 0, 0, 15));
        assert!(host(&net, 16).is_err());
    }

    #[test]
    fn test_vlan_id() {
        assert!(VlanId::new(1001).is_ok());
        assert!(VlanId::new(0).is_err());
        assert!(VlanId::new(4095).is_err());
    }

    #[test]
    fn test_network_type_names() {
        assert_eq!(NetworkType::Layer2Individual.to_string(), "layer2-individual");
        assert_eq!("hybrid".parse::<NetworkType>().unwrap(), NetworkType::Hybrid);
        assert!("layer2".parse::<NetworkType>().is_err());
    }
}
