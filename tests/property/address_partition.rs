// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Reserved Block Partitioning
//!
//! For every block size and every worker count that fits, the partitioner
//! must hand out distinct addresses inside the block, never the network,
//! gateway or broadcast address, and always the same ones for the same input.

use ipnet::Ipv4Net;
use metal_cluster::domain::partition;
use metal_cluster::ProvisionError;
use proptest::prelude::*;
use std::collections::HashSet;
use std::net::Ipv4Addr;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate an aligned block of 8 to 256 addresses
fn reserved_block() -> impl Strategy<Value = (Ipv4Net, u32)> {
    (24u8..=29, any::<u32>()).prop_map(|(prefix, base)| {
        let net = Ipv4Net::new(Ipv4Addr::from(base), prefix)
            .expect("prefix is at most 32")
            .trunc();
        (net, 1u32 << (32 - prefix))
    })
}

/// Generate a block together with a worker count that fits in it
fn block_with_workers() -> impl Strategy<Value = (Ipv4Net, u32, u32)> {
    reserved_block().prop_flat_map(|(net, quantity)| {
        (Just(net), Just(quantity), 0..=quantity - 6)
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: No address is handed out twice
    #[test]
    fn prop_addresses_are_distinct((net, quantity, workers) in block_with_workers()) {
        let set = partition(&net, quantity, workers).unwrap();
        let all = set.all();
        let unique: HashSet<_> = all.iter().collect();

        prop_assert_eq!(all.len(), 3 + workers as usize);
        prop_assert_eq!(unique.len(), all.len(), "addresses must be distinct");
    }

    /// Property: Every address lies inside the block, away from its edges
    #[test]
    fn prop_addresses_are_usable_hosts((net, quantity, workers) in block_with_workers()) {
        let set = partition(&net, quantity, workers).unwrap();
        let gateway = Ipv4Addr::from(u32::from(net.network()) + 1);

        for addr in set.all() {
            prop_assert!(net.contains(&addr), "{} outside {}", addr, net);
            prop_assert_ne!(addr, net.network());
            prop_assert_ne!(addr, net.broadcast());
            prop_assert_ne!(addr, gateway);
        }
    }

    /// Property: Partitioning is deterministic
    #[test]
    fn prop_partition_is_deterministic((net, quantity, workers) in block_with_workers()) {
        prop_assert_eq!(
            partition(&net, quantity, workers).unwrap(),
            partition(&net, quantity, workers).unwrap()
        );
    }

    /// Property: Workers occupy consecutive offsets right after the admin
    #[test]
    fn prop_workers_follow_admin((net, quantity, workers) in block_with_workers()) {
        let set = partition(&net, quantity, workers).unwrap();

        let mut expected = u32::from(set.admin_ip) + 1;
        for worker in &set.worker_ips {
            prop_assert_eq!(u32::from(*worker), expected);
            expected += 1;
        }
        prop_assert!(expected <= u32::from(set.tink_vip));
    }

    /// Property: A worker count that reaches the VIPs is always rejected
    #[test]
    fn prop_overflow_rejected(((net, quantity), extra) in (reserved_block(), 1u32..64)) {
        let workers = quantity - 6 + extra;
        let result = partition(&net, quantity, workers);

        prop_assert!(matches!(result, Err(ProvisionError::Validation(_))));
    }
}
