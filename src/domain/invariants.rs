// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Cluster Invariants
//!
//! All checks here run before the resource graph is realized, so a rejected
//! cluster never reaches the provider.
//!
//! # Invariant Categories
//!
//! 1. **Structural Invariants**: required fields are present
//! 2. **Block Invariants**: the reserved block has a usable size
//! 3. **Capacity Invariants**: worker addresses never reach the VIPs at the
//!    top of the block

use crate::domain::addressing::{FIRST_WORKER_OFFSET, TINK_VIP_FROM_TOP};
use crate::domain::cluster::ClusterSpec;

/// Validation result with detailed error information
pub type ValidationResult = Result<(), ValidationError>;

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required string field is empty
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Hostname validation failed
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// Reserved block size is not a power of two of at least 8
    #[error("Reserved block quantity {0} must be a power of two and at least 8")]
    InvalidBlockQuantity(u32),

    /// Provider returned a block whose prefix disagrees with its quantity
    #[error("Reserved block {cidr} does not hold {quantity} addresses")]
    BlockSizeMismatch { cidr: String, quantity: u32 },

    /// The two pool sizes cannot be added without overflowing
    #[error("{control_plane} control-plane and {data_plane} data-plane workers exceed any block")]
    WorkerCountOverflow { control_plane: u32, data_plane: u32 },

    /// Forward-growing worker range would reach the reserved VIPs
    #[error(
        "{workers} workers need host offsets up to {required}, but offsets from {limit} \
         are reserved for VIPs in a block of {quantity}"
    )]
    WorkerRangeOverlapsVips {
        workers: u32,
        quantity: u32,
        required: u32,
        limit: u32,
    },
}

/// Minimum reserved block size
pub const MIN_BLOCK_QUANTITY: u32 = 8;

/// Validate that a required field is non-empty
pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

/// Validate the reserved block size
///
/// # Rules
/// - Power of two (a block is always a CIDR prefix)
/// - At least 8 addresses
pub fn validate_block_quantity(quantity: u32) -> ValidationResult {
    if quantity < MIN_BLOCK_QUANTITY || !quantity.is_power_of_two() {
        return Err(ValidationError::InvalidBlockQuantity(quantity));
    }
    Ok(())
}

/// Validate that `workers` addresses fit between the admin address and the VIPs
///
/// # Rules
/// - `3 + workers <= quantity - 3`
pub fn validate_worker_capacity(quantity: u32, workers: u32) -> ValidationResult {
    validate_block_quantity(quantity)?;

    let required = FIRST_WORKER_OFFSET.saturating_add(workers);
    let limit = quantity - TINK_VIP_FROM_TOP;
    if required > limit {
        return Err(ValidationError::WorkerRangeOverlapsVips {
            workers,
            quantity,
            required,
            limit,
        });
    }
    Ok(())
}

/// Total worker count of `spec`, rejecting counts whose sum overflows
pub fn worker_total(spec: &ClusterSpec) -> Result<u32, ValidationError> {
    spec.worker_count()
        .ok_or(ValidationError::WorkerCountOverflow {
            control_plane: spec.control_plane_count,
            data_plane: spec.data_plane_count,
        })
}

/// Validate a whole cluster specification against the block size it will get
pub fn validate_cluster_spec(spec: &ClusterSpec, quantity: u32) -> ValidationResult {
    validate_required("clusterName", &spec.cluster_name)?;
    validate_required("projectId", &spec.project_id)?;
    validate_required("metro", &spec.metro)?;

    // The admin node is built on the control-plane plan as well
    validate_required("controlPlaneDeviceType", &spec.control_plane_device_type)?;
    if spec.data_plane_count > 0 {
        validate_required("dataPlaneDeviceType", &spec.data_plane_device_type)?;
    }

    validate_worker_capacity(quantity, worker_total(spec)?)
}
