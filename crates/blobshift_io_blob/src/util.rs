use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::storage::StorageError;

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Collect every regular file under `path_dir` as a `/`-separated key
/// starting with `c_key_prefix`. Symlinks and special files are skipped.
pub(crate) fn collect_file_keys(
    path_dir: &Path,
    c_key_prefix: &str,
    l_keys: &mut Vec<String>,
) -> Result<(), io::Error> {
    for entry_res in fs::read_dir(path_dir)? {
        let entry = entry_res?;
        let c_name = entry.file_name().to_string_lossy().to_string();
        let c_key = if c_key_prefix.is_empty() {
            c_name
        } else {
            format!("{c_key_prefix}/{c_name}")
        };

        let cfg_file_type = entry.file_type()?;
        if cfg_file_type.is_dir() {
            collect_file_keys(&entry.path(), &c_key, l_keys)?;
        } else if cfg_file_type.is_file() {
            l_keys.push(c_key);
        } else {
            debug!(path = %entry.path().display(), "non-regular entry skipped");
        }
    }
    Ok(())
}

/// Reject object paths that would leave the container through a symlink.
pub(crate) fn validate_object_path_safety(
    path_item: &Path,
    path_dir_container: &Path,
) -> Result<(), StorageError> {
    let path_rel = path_item.strip_prefix(path_dir_container).map_err(|_| {
        StorageError::InvalidKey(format!(
            "path escapes container: {}",
            path_item.display()
        ))
    })?;

    let mut path_cursor = path_dir_container.to_path_buf();
    for part_rel in path_rel.components() {
        path_cursor.push(part_rel.as_os_str());
        match fs::symlink_metadata(&path_cursor) {
            Ok(meta_cursor) => {
                if meta_cursor.file_type().is_symlink() {
                    return Err(StorageError::InvalidKey(format!(
                        "path traverses symlink component: {}",
                        path_cursor.display()
                    )));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(StorageError::Io(e)),
        }
    }
    Ok(())
}

pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    fs::copy(path_file_src, path_file_dst)?;
    #[cfg(target_os = "linux")]
    {
        apply_metadata_linux(path_file_src, path_file_dst)?;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply_metadata_linux(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        let _ = xattr::set(path_file_dst, &name, &raw_value);
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
