//! Named, lazily created fixtures with dependencies and cleanup.
//!
//! Resources are registered as [`ResourceSpec`]s on a [`ResourceManager`],
//! which owns their live values for the lifetime of one suite. Creation always
//! happens dependencies-first; bulk deletion unwinds the actual creation order.

pub mod manager;
pub mod spec;

pub use manager::ResourceManager;
pub use spec::{Factory, Release, ResourceKey, ResourceSpec};
