// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # os-tag
//!
//! Declarative, idempotent tag management for OpenStack compute servers and
//! block-storage volumes.
//!
//! ## Overview
//!
//! Each run takes a resource reference (name or ID), a desired state, and a
//! tag collection, and converges the resource's tags toward it:
//!
//! - Server tags are opaque labels. `present` replaces the whole set in one
//!   call; `absent` removes the listed tags one call at a time.
//! - Volume tags are key/value pairs kept on a vendor sub-resource of the
//!   block-storage API. `present` creates the listed pairs; `absent` deletes
//!   the listed pairs whose key exists.
//!
//! The result reports whether anything changed and the tags the resource
//! ends up with. A check mode computes the same answer without mutating.
//!
//! ## Architecture
//!
//! 1. **Desired State**: Given on the command line or in a task file
//! 2. **Observed State**: Read from the compute or block-storage API
//! 3. **Reconciler**: Diffs the two and applies the difference
//!
//! ## Modules
//!
//! - [`config`]: Cloud credentials, task files, and validation
//! - [`cloud`]: OpenStack API client and per-resource tag backends
//! - [`planner`]: Tag collections and diff computation
//! - [`reconciler`]: The shared reconcile procedure
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! server: web-01
//! state: present
//! tags:
//!   - env.prod
//!   - team.platform
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod cloud;
pub mod config;
pub mod error;
pub mod planner;
pub mod reconciler;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use cloud::{CloudApi, OpenStackClient, ServerTagBackend, TagBackend, VolumeTagBackend};
pub use config::{CloudConfig, ConfigParser, ConfigValidator, TagTask};
pub use error::{Result, TagError};
pub use planner::{DesiredState, DiffEngine, ServerTags, TagDiff, VolumeTags};
pub use reconciler::{TagOutcome, TagReconciler, TagRequest};
