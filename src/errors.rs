// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for cluster provisioning
//!
//! Every failure that can reach the caller is a [`ProvisionError`]. The type is
//! `Clone` because a failed [`AsyncValue`](crate::frp::AsyncValue) hands the same
//! error to every consumer that reads it.

use thiserror::Error;

use crate::domain::{HostnameError, NetworkError, ValidationError};

/// Errors that can occur while planning or realizing a cluster
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    /// The cluster specification was rejected before any provider call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The provider rejected creation or attachment of a resource
    #[error("Provider rejected {resource}: {message}")]
    Provider { resource: String, message: String },

    /// A composition step (map/join) failed to produce its value
    #[error("Composition error: {0}")]
    Composition(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ProvisionError {
    /// Provider failure attributed to a graph node
    pub fn provider(resource: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ProvisionError::Provider {
            resource: resource.into(),
            message: err.to_string(),
        }
    }

    /// Name of the resource that failed, if the failure came from the provider
    pub fn failing_resource(&self) -> Option<&str> {
        match self {
            ProvisionError::Provider { resource, .. } => Some(resource),
            _ => None,
        }
    }

    /// Whether this error was raised by validation
    pub fn is_validation(&self) -> bool {
        matches!(self, ProvisionError::Validation(_))
    }
}

/// Result type for provisioning operations
pub type ProvisionResult<T> = Result<T, ProvisionError>;

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        ProvisionError::Composition(format!("serialization failed: {}", err))
    }
}

impl From<NetworkError> for ProvisionError {
    fn from(err: NetworkError) -> Self {
        ProvisionError::Composition(err.to_string())
    }
}

impl From<HostnameError> for ProvisionError {
    fn from(err: HostnameError) -> Self {
        ProvisionError::Validation(ValidationError::InvalidHostname(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_names_resource() {
        let err = ProvisionError::provider("device/admin", "plan unavailable in metro");
        assert_eq!(err.failing_resource(), Some("device/admin"));
        assert_eq!(
            err.to_string(),
            "Provider rejected device/admin: plan unavailable in metro"
        );
    }

    #[test]
    fn test_validation_conversion() {
        let err: ProvisionError = ValidationError::EmptyField("clusterName").into();
        assert!(err.is_validation());
        assert_eq!(err.failing_resource(), None);
    }
}
