//! Object key helpers. Keys always use `/` as separator regardless of host OS.

////////////////////////////////////////////////////////////////////////////////
// #region KeyNormalization

const C_KEY_SEPARATOR: char = '/';

/// Normalize an object key.
///
/// - duplicate separators collapse,
/// - leading/trailing separators are dropped,
/// - `.` segments are removed,
/// - `..` removes the preceding segment when there is one.
///
/// A `..` with nothing left to remove is kept so callers can reject it.
pub fn normalize_key(path: &str) -> String {
    let mut l_parts: Vec<&str> = Vec::new();
    for part in path.split(C_KEY_SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => match l_parts.last() {
                Some(last) if *last != ".." => {
                    l_parts.pop();
                }
                _ => l_parts.push(".."),
            },
            _ => l_parts.push(part),
        }
    }
    l_parts.join("/")
}

/// Folder names share key normalization; an empty folder stays empty.
pub fn clean_folder_name(folder_name: &str) -> String {
    normalize_key(folder_name)
}

pub fn combine_folder_and_file_name(folder_name: &str, file_name: &str) -> String {
    let c_folder = clean_folder_name(folder_name);
    if c_folder.is_empty() {
        return normalize_key(file_name);
    }
    normalize_key(&format!("{c_folder}/{file_name}"))
}

/// Split a key into `(folder, file_name)` after normalization.
pub fn split_folder_and_file_name(path: &str) -> (String, String) {
    let c_path = normalize_key(path);
    match c_path.rsplit_once(C_KEY_SEPARATOR) {
        Some((folder, file_name)) => (folder.to_string(), file_name.to_string()),
        None => (String::new(), c_path),
    }
}

/// Last segment of a normalized key.
pub fn extract_file_name(path: &str) -> String {
    split_folder_and_file_name(path).1
}

/// Blob-style raw string prefix test (`2023` also covers `2023-q1/...`).
pub fn has_key_prefix(path: &str, prefix: &str) -> bool {
    prefix.is_empty() || path.starts_with(prefix)
}

/// Whether a normalized key still climbs above its root.
pub fn is_escaping_key(path: &str) -> bool {
    normalize_key(path).split(C_KEY_SEPARATOR).any(|part| part == "..")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
