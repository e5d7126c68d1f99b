// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Property tests for the pure address partitioner and for the laws of
//! AsyncValue composition.

mod address_partition;
mod async_value_laws;
