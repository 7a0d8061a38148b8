//! Local-directory backend: one sub-directory per container, one file per object.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{SpecCopyHandle, SpecCopyState, SpecObjectListing, StorageClient, StorageError};
use crate::path::{has_key_prefix, is_escaping_key, normalize_key};
use crate::spec::EnumCopyStatus;
use crate::util::{collect_file_keys, copy_file_with_metadata, validate_object_path_safety};

/// Blob store rooted at a local directory.
///
/// Copies complete synchronously and keep permissions, timestamps and (on
/// Linux) extended attributes of the source file.
#[derive(Debug)]
pub struct LocalStorage {
    path_dir_root: PathBuf,
    copies: Mutex<HashMap<String, SpecCopyState>>,
    n_copies: AtomicU64,
}

impl LocalStorage {
    /// Open a store rooted at `path_dir_root`, which must be an existing directory.
    pub fn open<P: AsRef<Path>>(path_dir_root: P) -> Result<Self, StorageError> {
        let path_dir_root = path_dir_root.as_ref().to_path_buf();
        let meta_root = fs::metadata(&path_dir_root).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => StorageError::Unauthorized(format!(
                "cannot access storage root {}",
                path_dir_root.display()
            )),
            _ => StorageError::Io(e),
        })?;
        if !meta_root.is_dir() {
            return Err(StorageError::Backend(format!(
                "storage root is not a directory: {}",
                path_dir_root.display()
            )));
        }
        Ok(Self {
            path_dir_root,
            copies: Mutex::new(HashMap::new()),
            n_copies: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.path_dir_root
    }

    fn path_container(&self, container: &str) -> Result<PathBuf, StorageError> {
        if container.is_empty() || container.contains(['/', '\\']) || container == ".." {
            return Err(StorageError::InvalidKey(format!(
                "invalid container name `{container}`"
            )));
        }
        let path_dir_container = self.path_dir_root.join(container);
        if !path_dir_container.is_dir() {
            return Err(StorageError::ContainerNotFound {
                container: container.to_string(),
            });
        }
        Ok(path_dir_container)
    }

    fn path_object(&self, container: &str, path: &str) -> Result<PathBuf, StorageError> {
        let path_dir_container = self.path_container(container)?;
        let c_key = normalize_key(path);
        if c_key.is_empty() || is_escaping_key(&c_key) || c_key.contains('\\') {
            return Err(StorageError::InvalidKey(path.to_string()));
        }
        let mut path_item = path_dir_container.clone();
        for part in c_key.split('/') {
            path_item.push(part);
        }
        validate_object_path_safety(&path_item, &path_dir_container)?;
        Ok(path_item)
    }

    fn next_copy_id(&self) -> String {
        let n_copy = self.n_copies.fetch_add(1, Ordering::Relaxed) + 1;
        format!("local-copy-{n_copy}")
    }
}

fn _map_io(e: io::Error, container: &str, path: &str) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::ObjectNotFound {
            container: container.to_string(),
            path: path.to_string(),
        },
        io::ErrorKind::PermissionDenied => {
            StorageError::Unauthorized(format!("{container}/{path}: {e}"))
        }
        _ => StorageError::Io(e),
    }
}

impl StorageClient for LocalStorage {
    fn list_objects(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<SpecObjectListing>, StorageError> {
        let path_dir_container = self.path_container(container)?;
        let mut l_keys = Vec::new();
        collect_file_keys(&path_dir_container, "", &mut l_keys)
            .map_err(|e| _map_io(e, container, prefix))?;
        l_keys.sort();
        Ok(l_keys
            .into_iter()
            .filter(|key| has_key_prefix(key, prefix))
            .map(|name| SpecObjectListing { name })
            .collect())
    }

    fn copy_object(
        &self,
        container: &str,
        path_src: &str,
        path_dst: &str,
        _if_synchronous: bool,
    ) -> Result<SpecCopyHandle, StorageError> {
        let path_file_src = self.path_object(container, path_src)?;
        let path_file_dst = self.path_object(container, path_dst)?;
        if !path_file_src.is_file() {
            return Err(StorageError::ObjectNotFound {
                container: container.to_string(),
                path: path_src.to_string(),
            });
        }
        if path_file_src == path_file_dst {
            return Err(StorageError::Backend(format!(
                "source and destination are the same object: {container}/{path_src}"
            )));
        }

        let id = self.next_copy_id();
        let res_copy = path_file_dst
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| copy_file_with_metadata(&path_file_src, &path_file_dst));
        let status = match res_copy {
            Ok(_) => EnumCopyStatus::Success,
            Err(e) => {
                warn!(
                    container,
                    path_src,
                    path_dst,
                    error = %e,
                    "local copy failed"
                );
                EnumCopyStatus::Failed
            }
        };
        self.copies.lock().insert(
            id.clone(),
            SpecCopyState {
                status,
                id: id.clone(),
            },
        );
        debug!(container, path_src, path_dst, %id, %status, "local copy finished");

        Ok(SpecCopyHandle {
            container: container.to_string(),
            path_src: path_src.to_string(),
            path_dst: path_dst.to_string(),
            id,
        })
    }

    fn get_copy_status(&self, handle: &SpecCopyHandle) -> Result<SpecCopyState, StorageError> {
        self.copies
            .lock()
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| StorageError::HandleNotFound {
                id: handle.id.clone(),
            })
    }

    fn abort_copy(&self, handle: &SpecCopyHandle) -> Result<(), StorageError> {
        let mut map_copies = self.copies.lock();
        let Some(copy_state) = map_copies.get_mut(&handle.id) else {
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

        let path_file_dst = self.path_object(&handle.container, &handle.path_dst)?;
        match fs::remove_file(&path_file_dst) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(_map_io(e, &handle.container, &handle.path_dst)),
        }
        copy_state.status = EnumCopyStatus::Aborted;
        Ok(())
    }

    fn delete_object(&self, container: &str, path: &str) -> Result<(), StorageError> {
        let path_file = self.path_object(container, path)?;
        if path_file.is_dir() {
            return Err(StorageError::ObjectNotFound {
                container: container.to_string(),
                path: path.to_string(),
            });
        }
        fs::remove_file(&path_file).map_err(|e| _map_io(e, container, path))
    }

    fn upload_object(
        &self,
        container: &str,
        path: &str,
        reader: &mut dyn Read,
    ) -> Result<(), StorageError> {
        let path_file = self.path_object(container, path)?;
        if let Some(path_parent) = path_file.parent() {
            fs::create_dir_all(path_parent).map_err(|e| _map_io(e, container, path))?;
        }
        let mut file_dst = fs::File::create_new(&path_file).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists {
                container: container.to_string(),
                path: path.to_string(),
            },
            _ => _map_io(e, container, path),
        })?;
        io::copy(reader, &mut file_dst).map_err(|e| _map_io(e, container, path))?;
        Ok(())
    }

    fn download_object(&self, container: &str, path: &str) -> Result<Box<dyn Read>, StorageError> {
        let path_file = self.path_object(container, path)?;
        let file_src = fs::File::open(&path_file).map_err(|e| _map_io(e, container, path))?;
        Ok(Box::new(file_src))
    }
}
