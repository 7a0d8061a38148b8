//! Storage capability interface and bundled backends.
//!
//! The engine only talks to [`StorageClient`]; provider SDKs, retries and
//! authentication live behind it.

use std::io::Read;

use thiserror::Error;

use crate::spec::EnumCopyStatus;

mod local;
mod memory;

pub use local::LocalStorage;
pub use memory::{EnumStorageCall, MemoryStorage};

/// Backend failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Container not found: {container}")]
    ContainerNotFound { container: String },

    #[error("Object not found: {container}/{path}")]
    ObjectNotFound { container: String, path: String },

    #[error("Object already exists: {container}/{path}")]
    AlreadyExists { container: String, path: String },

    #[error("Copy handle not found: {id}")]
    HandleNotFound { id: String },

    /// Credentials were rejected by the backend.
    #[error("Access denied: {0}")]
    Unauthorized(String),

    /// Key would resolve outside its container.
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// One entry of a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecObjectListing {
    pub name: String,
}

/// Reference to a server-side copy started by [`StorageClient::copy_object`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyHandle {
    pub container: String,
    pub path_src: String,
    pub path_dst: String,
    pub id: String,
}

/// Copy status read back from the destination object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCopyState {
    pub status: EnumCopyStatus,
    pub id: String,
}

/// Capabilities the engine needs from a blob store.
///
/// Every call blocks until the backend gives a definite answer.
pub trait StorageClient {
    /// List objects whose name starts with `prefix`, pagination fully consumed.
    fn list_objects(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<SpecObjectListing>, StorageError>;

    /// Start a server-side copy inside `container`.
    fn copy_object(
        &self,
        container: &str,
        path_src: &str,
        path_dst: &str,
        if_synchronous: bool,
    ) -> Result<SpecCopyHandle, StorageError>;

    fn get_copy_status(&self, handle: &SpecCopyHandle) -> Result<SpecCopyState, StorageError>;

    /// Abort an unfinished copy and drop whatever reached the destination.
    fn abort_copy(&self, handle: &SpecCopyHandle) -> Result<(), StorageError>;

    fn delete_object(&self, container: &str, path: &str) -> Result<(), StorageError>;

    /// Create a new object; an existing object at `path` is an error.
    fn upload_object(
        &self,
        container: &str,
        path: &str,
        reader: &mut dyn Read,
    ) -> Result<(), StorageError>;

    fn download_object(&self, container: &str, path: &str) -> Result<Box<dyn Read>, StorageError>;
}
