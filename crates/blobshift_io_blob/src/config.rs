//! Storage configuration parsed from a connection string, and the client factory.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use crate::spec::BlobOpError;
use crate::storage::{LocalStorage, MemoryStorage, StorageClient, StorageError};

/// Backend selected by the `Backend` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumStorageBackend {
    /// `Backend=local;Root=<dir>`
    Local { path_dir_root: PathBuf },
    /// `Backend=memory`
    Memory,
}

/// Explicit storage configuration handed to [`open_storage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecStorageConfig {
    pub backend: EnumStorageBackend,
}

impl SpecStorageConfig {
    /// Parse `Key=Value;Key=Value`. Keys are case-insensitive, empty pairs are
    /// ignored, values may contain `=`.
    ///
    /// Any malformed string is reported as a credential problem because the
    /// connection string is the credential.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, BlobOpError> {
        let mut c_backend: Option<String> = None;
        let mut c_root: Option<String> = None;

        for pair in connection_string.split(';').map(str::trim) {
            if pair.is_empty() {
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                return Err(_credentials(format!(
                    "malformed connection string segment `{pair}`"
                )));
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "backend" => c_backend = Some(value.trim().to_ascii_lowercase()),
                "root" => c_root = Some(value.trim().to_string()),
                other => {
                    return Err(_credentials(format!(
                        "unknown connection string key `{other}`"
                    )));
                }
            }
        }

        let backend = match c_backend.as_deref() {
            Some("local") => {
                let Some(c_root) = c_root.filter(|v| !v.is_empty()) else {
                    return Err(_credentials(
                        "`Root` is required for the local backend".to_string(),
                    ));
                };
                EnumStorageBackend::Local {
                    path_dir_root: PathBuf::from(c_root),
                }
            }
            Some("memory") => EnumStorageBackend::Memory,
            Some(other) => return Err(_credentials(format!("unknown backend `{other}`"))),
            None => return Err(_credentials("`Backend` is required".to_string())),
        };
        Ok(Self { backend })
    }
}

impl FromStr for SpecStorageConfig {
    type Err = BlobOpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_connection_string(value)
    }
}

fn _credentials(message: String) -> BlobOpError {
    BlobOpError::IncorrectCredentials { message }
}

/// Build the storage client described by `spec_config`.
pub fn open_storage(
    spec_config: &SpecStorageConfig,
) -> Result<Box<dyn StorageClient>, BlobOpError> {
    match &spec_config.backend {
        EnumStorageBackend::Local { path_dir_root } => {
            let storage = LocalStorage::open(path_dir_root).map_err(|e| match e {
                StorageError::Unauthorized(message) => _credentials(message),
                other => _credentials(format!(
                    "cannot open storage root {}: {other}",
                    path_dir_root.display()
                )),
            })?;
            info!(root = %path_dir_root.display(), "opened local storage");
            Ok(Box::new(storage))
        }
        EnumStorageBackend::Memory => {
            info!("opened in-memory storage");
            Ok(Box::new(MemoryStorage::new()))
        }
    }
}
