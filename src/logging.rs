// Copyright (c) 2025 - Cowboy AI, Inc.
//! Tracing setup
//!
//! The library only emits `tracing` events. Embedding applications call
//! [`init_tracing`] once (or install their own subscriber) to see them;
//! `RUST_LOG` refines the filter, with INFO as the floor.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG`
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .try_init()
        .is_ok()
}
