//! OpenStack API integration module.
//!
//! This module provides the cloud API client interface, its live OpenStack
//! implementation, and the per-resource tag backends built on top of it.

mod api;
mod backend;
mod client;
#[cfg(test)]
mod fake;
mod server;
mod types;
mod volume;

pub use api::CloudApi;
pub use backend::TagBackend;
pub use client::OpenStackClient;
pub use server::ServerTagBackend;
pub use types::{
    ResolvedResource, Server, TagAction, Volume, VolumeTagActionRequest, VolumeTagList,
};
pub use volume::{action_path, tags_path, VolumeTagBackend};

#[cfg(test)]
pub(crate) use api::MockCloudApi;
#[cfg(test)]
pub(crate) use fake::FakeCloud;
