//! Storage backends and collaborator adapters implementing the domain ports.

pub mod in_memory;
pub mod locks;
pub mod notification;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
