//! Planning module for tag operations.
//!
//! This module holds the tag collection types and the diff engine that
//! compares desired tags with the tags observed on a resource.

mod diff;
mod tags;

pub use diff::{DiffEngine, TagDiff};
pub use tags::{DesiredState, ServerTags, TagCollection, VolumeTag, VolumeTags};
