//! Diff engine for comparing desired vs current tags.
//!
//! This module decides whether a resource's tags already satisfy the desired
//! state and, if not, which mutations are required to converge them.

use std::fmt;
use tracing::debug;

use super::tags::{DesiredState, TagCollection};

/// Engine for computing tag diffs.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

/// Mutations needed to bring a resource's tags to the desired state.
#[derive(Debug, Clone, PartialEq)]
pub struct TagDiff<C: TagCollection> {
    /// Desired state this diff was computed for.
    pub state: DesiredState,
    /// Whether the resource differs from the target.
    pub changed: bool,
    /// Full collection to write (`present` only).
    pub to_set: Option<C>,
    /// Entries to remove, one removal call each (`absent` only).
    pub to_remove: Vec<C::Entry>,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between current and desired tags.
    ///
    /// `present` compares both collections as sets and, on mismatch, writes
    /// the full desired collection. `absent` removes only the desired entries
    /// whose key is currently on the resource.
    #[must_use]
    pub fn compute<C: TagCollection>(
        &self,
        state: DesiredState,
        current: &C,
        desired: &C,
    ) -> TagDiff<C> {
        let diff = match state {
            DesiredState::Present => {
                let changed = current != desired;
                TagDiff {
                    state,
                    changed,
                    to_set: changed.then(|| desired.clone()),
                    to_remove: Vec::new(),
                }
            }
            DesiredState::Absent => {
                let to_remove: Vec<C::Entry> = desired
                    .entries()
                    .into_iter()
                    .filter(|entry| current.holds_key_of(entry))
                    .collect();
                TagDiff {
                    state,
                    changed: !to_remove.is_empty(),
                    to_set: None,
                    to_remove,
                }
            }
        };

        debug!("Tag diff ({state}): {diff}");
        diff
    }
}

impl<C: TagCollection> TagDiff<C> {
    /// Returns true if no mutation is required.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        !self.changed
    }
}

impl<C: TagCollection> fmt::Display for TagDiff<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.changed {
            return write!(f, "no change");
        }

        if let Some(to_set) = &self.to_set {
            write!(f, "set [")?;
            for (i, entry) in to_set.entries().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{entry}")?;
            }
            write!(f, "]")?;
        }

        if !self.to_remove.is_empty() {
            write!(f, "remove [")?;
            for (i, entry) in self.to_remove.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{entry}")?;
            }
            write!(f, "]")?;
        }

        Ok(())
    }
}
