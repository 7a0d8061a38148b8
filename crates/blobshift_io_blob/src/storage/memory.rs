//! Process-local backend with a call journal and fault injection.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{Cursor, Read};

use parking_lot::Mutex;

use super::{SpecCopyHandle, SpecCopyState, SpecObjectListing, StorageClient, StorageError};
use crate::spec::EnumCopyStatus;

/// One recorded call against [`MemoryStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumStorageCall {
    List { container: String, prefix: String },
    Copy { container: String, path_src: String, path_dst: String },
    Status { id: String },
    Abort { id: String },
    Delete { container: String, path: String },
    Upload { container: String, path: String },
    Download { container: String, path: String },
}

impl EnumStorageCall {
    /// Whether the call changes stored objects.
    pub fn if_mutating(&self) -> bool {
        matches!(
            self,
            Self::Copy { .. } | Self::Abort { .. } | Self::Delete { .. } | Self::Upload { .. }
        )
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    containers: BTreeSet<String>,
    objects: BTreeMap<(String, String), Vec<u8>>,
    copies: HashMap<String, SpecCopyState>,
    calls: Vec<EnumStorageCall>,
    forced_copy_status: HashMap<String, EnumCopyStatus>,
    failing_deletes: HashSet<String>,
    if_ignore_list_prefix: bool,
    if_unauthorized: bool,
    n_copies: u64,
}

impl MemoryState {
    fn check_access(&self) -> Result<(), StorageError> {
        if self.if_unauthorized {
            return Err(StorageError::Unauthorized(
                "memory backend is configured to reject credentials".to_string(),
            ));
        }
        Ok(())
    }

    fn check_container(&self, container: &str) -> Result<(), StorageError> {
        if !self.containers.contains(container) {
            return Err(StorageError::ContainerNotFound {
                container: container.to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory blob store. Listing order is lexicographic, like most providers.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_container(&self, container: &str) {
        self.state.lock().containers.insert(container.to_string());
    }

    /// Store `bytes` at `path`, creating the container when needed.
    pub fn insert(&self, container: &str, path: &str, bytes: &[u8]) {
        let mut state = self.state.lock();
        state.containers.insert(container.to_string());
        state
            .objects
            .insert((container.to_string(), path.to_string()), bytes.to_vec());
    }

    pub fn contains(&self, container: &str, path: &str) -> bool {
        self.state
            .lock()
            .objects
            .contains_key(&(container.to_string(), path.to_string()))
    }

    pub fn read(&self, container: &str, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .objects
            .get(&(container.to_string(), path.to_string()))
            .cloned()
    }

    pub fn object_names(&self, container: &str) -> Vec<String> {
        self.state
            .lock()
            .objects
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// Snapshot of every call made so far.
    pub fn calls(&self) -> Vec<EnumStorageCall> {
        self.state.lock().calls.clone()
    }

    /// Make copies into `path_dst` end with `status`. Non-success copies leave
    /// a truncated object at the destination until aborted.
    pub fn force_copy_status(&self, path_dst: &str, status: EnumCopyStatus) {
        self.state
            .lock()
            .forced_copy_status
            .insert(path_dst.to_string(), status);
    }

    /// Make every delete of `path` fail.
    pub fn fail_delete(&self, path: &str) {
        self.state.lock().failing_deletes.insert(path.to_string());
    }

    /// Return the whole container from `list_objects`, prefix or not.
    pub fn set_ignore_list_prefix(&self, if_ignore: bool) {
        self.state.lock().if_ignore_list_prefix = if_ignore;
    }

    pub fn set_unauthorized(&self, if_unauthorized: bool) {
        self.state.lock().if_unauthorized = if_unauthorized;
    }
}

impl StorageClient for MemoryStorage {
    fn list_objects(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<SpecObjectListing>, StorageError> {
        let mut state = self.state.lock();
        state.calls.push(EnumStorageCall::List {
            container: container.to_string(),
            prefix: prefix.to_string(),
        });
        state.check_access()?;
        state.check_container(container)?;

        let if_ignore_prefix = state.if_ignore_list_prefix;
        Ok(state
            .objects
            .keys()
            .filter(|(c, p)| c == container && (if_ignore_prefix || p.starts_with(prefix)))
            .map(|(_, p)| SpecObjectListing { name: p.clone() })
            .collect())
    }

    fn copy_object(
        &self,
        container: &str,
        path_src: &str,
        path_dst: &str,
        _if_synchronous: bool,
    ) -> Result<SpecCopyHandle, StorageError> {
        let mut state = self.state.lock();
        state.calls.push(EnumStorageCall::Copy {
            container: container.to_string(),
            path_src: path_src.to_string(),
            path_dst: path_dst.to_string(),
        });
        state.check_access()?;
        state.check_container(container)?;

        let Some(bytes_src) = state
            .objects
            .get(&(container.to_string(), path_src.to_string()))
            .cloned()
        else {
            return Err(StorageError::ObjectNotFound {
                container: container.to_string(),
                path: path_src.to_string(),
            });
        };

        state.n_copies += 1;
        let id = format!("copy-{}", state.n_copies);
        let status = state
            .forced_copy_status
            .get(path_dst)
            .copied()
            .unwrap_or(EnumCopyStatus::Success);
        let bytes_dst = match status {
            EnumCopyStatus::Success => bytes_src,
            _ => bytes_src[..bytes_src.len() / 2].to_vec(),
        };
        state
            .objects
            .insert((container.to_string(), path_dst.to_string()), bytes_dst);
        state.copies.insert(
            id.clone(),
            SpecCopyState {
                status,
                id: id.clone(),
            },
        );

        Ok(SpecCopyHandle {
            container: container.to_string(),
            path_src: path_src.to_string(),
            path_dst: path_dst.to_string(),
            id,
        })
    }

    fn get_copy_status(&self, handle: &SpecCopyHandle) -> Result<SpecCopyState, StorageError> {
        let mut state = self.state.lock();
        state.calls.push(EnumStorageCall::Status {
            id: handle.id.clone(),
        });
        state.check_access()?;
        state
            .copies
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| StorageError::HandleNotFound {
                id: handle.id.clone(),
            })
    }

    fn abort_copy(&self, handle: &SpecCopyHandle) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.calls.push(EnumStorageCall::Abort {
            id: handle.id.clone(),
        });
        state.check_access()?;

        let Some(copy_state) = state.copies.get_mut(&handle.id) else {
            return Err(StorageError::HandleNotFound {
                id: handle.id.clone(),
            });
        };
        if copy_state.status == EnumCopyStatus::Success {
            return Err(StorageError::Backend(format!(
                "copy {} already completed",
                handle.id
            )));
        }
        copy_state.status = EnumCopyStatus::Aborted;
        state
            .objects
            .remove(&(handle.container.clone(), handle.path_dst.clone()));
        Ok(())
    }

    fn delete_object(&self, container: &str, path: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.calls.push(EnumStorageCall::Delete {
            container: container.to_string(),
            path: path.to_string(),
        });
        state.check_access()?;
        if state.failing_deletes.contains(path) {
            return Err(StorageError::Backend(format!(
                "injected delete failure for {path}"
            )));
        }
        state
            .objects
            .remove(&(container.to_string(), path.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::ObjectNotFound {
                container: container.to_string(),
                path: path.to_string(),
            })
    }

    fn upload_object(
        &self,
        container: &str,
        path: &str,
        reader: &mut dyn Read,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        state.calls.push(EnumStorageCall::Upload {
            container: container.to_string(),
            path: path.to_string(),
        });
        state.check_access()?;
        state.check_container(container)?;

        let key = (container.to_string(), path.to_string());
        if state.objects.contains_key(&key) {
            return Err(StorageError::AlreadyExists {
                container: container.to_string(),
                path: path.to_string(),
            });
        }
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        state.objects.insert(key, bytes);
        Ok(())
    }

    fn download_object(&self, container: &str, path: &str) -> Result<Box<dyn Read>, StorageError> {
        let mut state = self.state.lock();
        state.calls.push(EnumStorageCall::Download {
            container: container.to_string(),
            path: path.to_string(),
        });
        state.check_access()?;
        let bytes = state
            .objects
            .get(&(container.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound {
                container: container.to_string(),
                path: path.to_string(),
            })?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}
