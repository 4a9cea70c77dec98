//! Configuration validation for clouds and tag tasks.
//!
//! Everything here runs before the first API call, so a bad invocation fails
//! without touching the cloud.

use crate::error::{ConfigError, Result, TagError};
use tracing::debug;

use super::spec::{CloudConfig, ServerTagTask, TagTask, VolumeTagTask};
use crate::planner::{DesiredState, TagCollection};

/// Characters the compute API rejects inside a server tag.
const FORBIDDEN_SERVER_TAG_CHARS: &[char] = &['/', ','];

/// Validator for cloud settings and tag tasks.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates the connection settings of a cloud.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any required setting is missing.
    pub fn validate_cloud(&self, cloud: &CloudConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();
        let auth = &cloud.auth;

        let required = [
            ("auth.auth_url", "OS_AUTH_URL", &auth.auth_url),
            ("auth.username", "OS_USERNAME", &auth.username),
            ("auth.password", "OS_PASSWORD", &auth.password),
        ];
        for (field, var, value) in required {
            if is_blank(value.as_deref()) {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("{field} is required (or set {var})"),
                });
            }
        }

        if is_blank(auth.project_name.as_deref()) && is_blank(auth.project_id.as_deref()) {
            result.errors.push(ValidationError {
                field: String::from("auth.project_name"),
                message: String::from(
                    "auth.project_name or auth.project_id is required (or set OS_PROJECT_NAME)",
                ),
            });
        }

        if cloud.timeout == Some(0) {
            result.errors.push(ValidationError {
                field: String::from("timeout"),
                message: String::from("Timeout must be at least 1 second"),
            });
        }

        if let Some(interface) = &cloud.interface {
            if !matches!(interface.as_str(), "public" | "internal" | "admin") {
                result.warnings.push(format!(
                    "interface: '{interface}' is not one of public, internal, admin"
                ));
            }
        }

        result.into_outcome("Cloud")
    }

    /// Validates a tag task.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if the reference or any tag is
    /// malformed.
    pub fn validate_task(&self, task: &TagTask) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        match task {
            TagTask::Server(task) => Self::validate_server_task(task, &mut result),
            TagTask::Volume(task) => Self::validate_volume_task(task, &mut result),
        }

        result.into_outcome("Task")
    }

    fn validate_server_task(task: &ServerTagTask, result: &mut ValidationResult) {
        if task.server.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("server"),
                message: String::from("Server name or ID cannot be empty"),
            });
        }

        for (i, tag) in task.tags.iter().enumerate() {
            if tag.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("tags[{i}]"),
                    message: String::from("Server tags cannot be empty"),
                });
            } else if tag.contains(FORBIDDEN_SERVER_TAG_CHARS) {
                result.errors.push(ValidationError {
                    field: format!("tags[{i}]"),
                    message: format!("Server tag '{tag}' cannot contain '/' or ','"),
                });
            }
        }

        if task.state == DesiredState::Present && task.tags.is_empty() {
            result.warnings.push(String::from(
                "tags: state=present with no tags removes every tag from the server",
            ));
        }

        if task.availability_zone.is_some() {
            debug!("availability_zone is ignored");
        }
    }

    fn validate_volume_task(task: &VolumeTagTask, result: &mut ValidationResult) {
        if task.volume.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("volume"),
                message: String::from("Volume name or ID cannot be empty"),
            });
        }

        for tag in task.tags.entries() {
            if tag.key.is_empty() {
                result.errors.push(ValidationError {
                    field: String::from("tags"),
                    message: String::from("Volume tag keys cannot be empty"),
                });
            }
        }

        if task.state == DesiredState::Present && task.tags.is_empty() {
            result.warnings.push(String::from(
                "tags: state=present with no tags creates nothing, but reports changed \
                 whenever the volume already has tags",
            ));
        }

        if task.availability_zone.is_some() {
            debug!("availability_zone is ignored");
        }
    }
}

/// Returns true if an optional setting is unset or whitespace.
fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Turns the first error into a [`ConfigError::ValidationError`].
    fn into_outcome(self, what: &str) -> Result<Self> {
        match self.errors.first() {
            None => {
                debug!("{what} validation passed");
                Ok(self)
            }
            Some(first) => Err(TagError::Config(ConfigError::ValidationError {
                message: first.message.clone(),
                field: Some(first.field.clone()),
            })),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
