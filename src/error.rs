//! Error types for the os-tag system.
//!
//! This module provides the error hierarchy for every stage of a tag
//! invocation: configuration, resource resolution, and OpenStack API calls.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tag operations.
#[derive(Debug, Error)]
pub enum TagError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised by the cloud API client.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The resource reference did not resolve to any resource.
    #[error("{kind} not found: {reference}")]
    ResourceNotFound {
        /// Kind of resource that was looked up.
        kind: ResourceKind,
        /// Name or ID that was requested.
        reference: String,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Kinds of taggable resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A compute instance.
    Server,
    /// A block-storage volume.
    Volume,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Volume => write!(f, "volume"),
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A required setting was supplied neither by file nor environment.
    #[error("Missing required setting: {name}")]
    MissingSetting {
        /// Name of the setting (or its environment variable).
        name: String,
    },

    /// The requested cloud is not defined in clouds.yaml.
    #[error("Cloud '{name}' not found in {path}")]
    UnknownCloud {
        /// Requested cloud name.
        name: String,
        /// File that was searched.
        path: PathBuf,
    },
}

/// Errors surfaced by the cloud API client.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request returned a non-success status.
    #[error("API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
        /// Decoded response body, when the service returned JSON.
        extra_data: Option<serde_json::Value>,
    },

    /// A name matched more than one resource.
    #[error("Multiple matches found for {reference}")]
    MultipleMatches {
        /// The ambiguous reference.
        reference: String,
    },

    /// The service catalog has no usable endpoint.
    #[error("No {service} endpoint found in service catalog (region: {region}, interface: {interface})")]
    EndpointNotFound {
        /// Catalog service type.
        service: String,
        /// Requested region, or `any`.
        region: String,
        /// Requested interface.
        interface: String,
    },

    /// Network error.
    #[error("Network error: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Result type alias for tag operations.
pub type Result<T> = std::result::Result<T, TagError>;

impl TagError {
    /// Creates a resource-not-found error.
    #[must_use]
    pub fn not_found(kind: ResourceKind, reference: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            kind,
            reference: reference.into(),
        }
    }

    /// Returns the provider diagnostic payload, if any.
    #[must_use]
    pub const fn extra_data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Provider(ProviderError::ApiRequestFailed { extra_data, .. }) => {
                extra_data.as_ref()
            }
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a missing-setting error.
    #[must_use]
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingSetting { name: name.into() }
    }
}

impl ProviderError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(
        status: u16,
        message: impl Into<String>,
        extra_data: Option<serde_json::Value>,
    ) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
            extra_data,
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
