//! Configuration module for the tag reconcilers.
//!
//! This module handles all configuration-related functionality:
//! - Locating and parsing `clouds.yaml`, with `OS_*` environment overrides
//! - Parsing tag task files
//! - Validation of settings and tags before any API call

mod parser;
mod spec;
mod validator;

pub use parser::{CLOUDS_FILE_ENV, CLOUDS_FILE_NAME, ConfigParser};
pub use spec::{
    AuthConfig, CloudConfig, CloudsFile, DEFAULT_TIMEOUT_SECS, ServerTagTask, TagTask,
    VolumeTagTask,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
